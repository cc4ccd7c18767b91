pub mod normalized_tensor;
pub mod score_vector;
pub mod scoring_backend;
