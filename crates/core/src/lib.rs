//! Per-frame face liveness scoring.
//!
//! Each frame flows through face location, largest-face selection,
//! normalization into a model tensor, scoring by an interchangeable
//! inference backend and a threshold verdict that is drawn back onto the
//! frame.

pub mod annotation;
pub mod detection;
pub mod liveness;
pub mod pipeline;
pub mod scoring;
pub mod shared;
pub mod video;
