pub mod backend_factory;
pub mod graph_backend;
pub mod runtime_backend;
pub mod session_io;
