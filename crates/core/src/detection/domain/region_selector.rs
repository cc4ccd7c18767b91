use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no face candidates to select from")]
    EmptyInput,
}

/// Keeps the pipeline single-subject: of all faces in a frame, only the
/// one with the largest box area is scored.
///
/// Ties go to the earliest candidate, so the result depends only on the
/// detector's output order.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegionSelector;

impl RegionSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, candidates: &[BoundingBox]) -> Result<BoundingBox, SelectionError> {
        // `Iterator::max_by_key` keeps the last maximum; ties must go to the first
        candidates
            .iter()
            .copied()
            .reduce(|best, b| if b.area() > best.area() { b } else { best })
            .ok_or(SelectionError::EmptyInput)
    }
}
