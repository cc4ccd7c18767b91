pub mod liveness_classifier;
pub mod verdict;
