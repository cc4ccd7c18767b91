use crate::scoring::domain::score_vector::ScoreVector;
use crate::shared::constants::{FACE_THRESHOLD, SCORE_DECIMALS};

/// Outcome of thresholding one face's liveness score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Verdict {
    /// Genuine-face probability rounded to three decimals.
    pub score: f64,
    pub is_live: bool,
}

/// Inclusive cutoff applied to the rounded score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdPolicy {
    threshold: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(FACE_THRESHOLD)
    }
}

impl ThresholdPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn judge(&self, scores: &ScoreVector) -> Verdict {
        let score = round_score(scores.liveness());
        Verdict {
            score,
            is_live: score >= self.threshold,
        }
    }
}

/// Rounds to [`SCORE_DECIMALS`] places, halves away from zero.
pub fn round_score(value: f64) -> f64 {
    let factor = 10f64.powi(SCORE_DECIMALS);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn scores(live: f32) -> ScoreVector {
        ScoreVector::new(vec![1.0 - live, live]).unwrap()
    }

    #[test]
    fn test_below_threshold_is_not_live() {
        let v = ThresholdPolicy::default().judge(&ScoreVector::new(vec![0.35, 0.652]).unwrap());
        assert_eq!(v.score, 0.652);
        assert!(!v.is_live);
    }

    #[test]
    fn test_rounding_up_to_one() {
        let v = ThresholdPolicy::default().judge(&ScoreVector::new(vec![0.05, 0.9997]).unwrap());
        assert_eq!(v.score, 1.0);
        assert!(v.is_live);
    }

    #[test]
    fn test_boundary_is_live() {
        let v = ThresholdPolicy::default().judge(&scores(0.7));
        assert_eq!(v.score, 0.7);
        assert!(v.is_live);
    }

    #[rstest]
    #[case::rounds_up_to_boundary(0.6996, 0.7, true)]
    #[case::rounds_down_below_boundary(0.6994, 0.699, false)]
    #[case::just_above(0.7004, 0.7, true)]
    #[case::zero(0.0, 0.0, false)]
    #[case::one(1.0, 1.0, true)]
    fn test_threshold_applies_to_rounded_score(
        #[case] live: f32,
        #[case] expected_score: f64,
        #[case] expected_live: bool,
    ) {
        let v = ThresholdPolicy::default().judge(&scores(live));
        assert_relative_eq!(v.score, expected_score);
        assert_eq!(v.is_live, expected_live);
    }

    #[test]
    fn test_custom_threshold() {
        let policy = ThresholdPolicy::new(0.9);
        assert!(!policy.judge(&scores(0.85)).is_live);
        assert!(policy.judge(&scores(0.95)).is_live);
        assert_relative_eq!(policy.threshold(), 0.9);
    }

    #[rstest]
    #[case(0.12345, 0.123)]
    #[case(0.1236, 0.124)]
    #[case(0.9999, 1.0)]
    #[case(0.0004, 0.0)]
    fn test_round_score(#[case] input: f64, #[case] expected: f64) {
        assert_relative_eq!(round_score(input), expected);
    }
}
