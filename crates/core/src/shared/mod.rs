pub mod bounding_box;
pub mod config;
pub mod constants;
pub mod execution_provider;
pub mod frame;
pub mod model_resolver;
