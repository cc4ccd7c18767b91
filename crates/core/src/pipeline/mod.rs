pub mod liveness_loop_use_case;
pub mod pipeline_logger;
pub mod retry;
