use crate::scoring::domain::scoring_backend::ScoringError;
use crate::shared::constants::LIVE_CLASS_INDEX;

/// Class probabilities for one face; index 1 is the genuine-face class.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreVector {
    probabilities: Vec<f32>,
}

impl ScoreVector {
    /// Rejects vectors too short to carry a genuine-face probability.
    pub fn new(probabilities: Vec<f32>) -> Result<Self, ScoringError> {
        if probabilities.len() <= LIVE_CLASS_INDEX {
            return Err(ScoringError::MalformedOutput {
                classes: probabilities.len(),
            });
        }
        Ok(Self { probabilities })
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    /// Unrounded genuine-face probability.
    pub fn liveness(&self) -> f64 {
        f64::from(self.probabilities[LIVE_CLASS_INDEX])
    }
}
