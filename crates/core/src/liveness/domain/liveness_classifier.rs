use thiserror::Error;

use crate::detection::domain::region_selector::{RegionSelector, SelectionError};
use crate::liveness::domain::verdict::{ThresholdPolicy, Verdict};
use crate::scoring::domain::normalized_tensor::{NormalizeError, Normalizer};
use crate::scoring::domain::scoring_backend::{BackendKind, ScoringBackend, ScoringError};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::LivenessSettings;
use crate::shared::frame::Frame;

/// Why a frame with faces ended without a verdict.
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("region selection failed: {0}")]
    Selection(#[from] SelectionError),
    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoringError),
}

/// Terminal state of one frame's trip through the classifier.
#[derive(Debug)]
pub enum FrameOutcome {
    NoFaceDetected,
    /// Faces were found but classification failed; shown like a frame
    /// without a verdict.
    Degraded {
        face_count: usize,
        error: ClassificationError,
    },
    Classified {
        face_count: usize,
        face: BoundingBox,
        verdict: Verdict,
    },
}

impl FrameOutcome {
    pub fn face_count(&self) -> usize {
        match self {
            FrameOutcome::NoFaceDetected => 0,
            FrameOutcome::Degraded { face_count, .. }
            | FrameOutcome::Classified { face_count, .. } => *face_count,
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            FrameOutcome::Classified { verdict, .. } => Some(*verdict),
            _ => None,
        }
    }

    pub fn face(&self) -> Option<BoundingBox> {
        match self {
            FrameOutcome::Classified { face, .. } => Some(*face),
            _ => None,
        }
    }
}

/// Selects the largest face, normalizes it for the injected backend,
/// scores it and applies the threshold policy.
///
/// Holds no per-frame state: every call starts from scratch.
pub struct LivenessClassifier {
    selector: RegionSelector,
    normalizer: Normalizer,
    backend: Box<dyn ScoringBackend>,
    policy: ThresholdPolicy,
}

impl LivenessClassifier {
    pub fn new(
        backend: Box<dyn ScoringBackend>,
        normalizer: Normalizer,
        policy: ThresholdPolicy,
    ) -> Self {
        Self {
            selector: RegionSelector::new(),
            normalizer,
            backend,
            policy,
        }
    }

    pub fn from_settings(backend: Box<dyn ScoringBackend>, settings: &LivenessSettings) -> Self {
        Self::new(
            backend,
            Normalizer::new(settings.crop_margin),
            ThresholdPolicy::new(settings.face_threshold),
        )
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    /// Runs select → normalize → score → threshold, propagating any failure.
    pub fn try_classify(
        &mut self,
        frame: &Frame,
        candidates: &[BoundingBox],
    ) -> Result<(BoundingBox, Verdict), ClassificationError> {
        let face = self.selector.select(candidates)?;
        let spec = self.backend.input_spec();
        let tensor = self.normalizer.normalize(frame, &face, &spec)?;
        let scores = self.backend.score(tensor)?;
        Ok((face, self.policy.judge(&scores)))
    }

    /// Classifies a frame, degrading instead of failing.
    pub fn classify(&mut self, frame: &Frame, candidates: &[BoundingBox]) -> FrameOutcome {
        if candidates.is_empty() {
            return FrameOutcome::NoFaceDetected;
        }
        let face_count = candidates.len();
        match self.try_classify(frame, candidates) {
            Ok((face, verdict)) => {
                log::debug!(
                    "Frame {}: liveness {:.3} ({})",
                    frame.index(),
                    verdict.score,
                    if verdict.is_live { "live" } else { "spoof" }
                );
                FrameOutcome::Classified {
                    face_count,
                    face,
                    verdict,
                }
            }
            Err(error) => {
                log::debug!("Frame {}: skipping classification: {}", frame.index(), error);
                FrameOutcome::Degraded { face_count, error }
            }
        }
    }
}
