use crate::liveness::domain::liveness_classifier::FrameOutcome;
use crate::shared::bounding_box::BoundingBox;

/// Presentation role of an overlay element; renderers map these to colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayTone {
    /// Neutral status such as the face count.
    Info,
    Live,
    NotLive,
    /// The selected face outline.
    Face,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayText {
    pub text: String,
    pub tone: OverlayTone,
}

/// What should be drawn for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    pub texts: Vec<OverlayText>,
    pub face_box: Option<BoundingBox>,
}

impl Overlay {
    /// Face count always; liveness score and face box only with a verdict.
    pub fn from_outcome(outcome: &FrameOutcome) -> Self {
        let mut overlay = Overlay {
            texts: vec![OverlayText {
                text: format!("Faces: {}", outcome.face_count()),
                tone: OverlayTone::Info,
            }],
            face_box: None,
        };
        if let (Some(verdict), Some(face)) = (outcome.verdict(), outcome.face()) {
            overlay.texts.push(OverlayText {
                text: format!("Liveness: {:.3}", verdict.score),
                tone: if verdict.is_live {
                    OverlayTone::Live
                } else {
                    OverlayTone::NotLive
                },
            });
            overlay.face_box = Some(face);
        }
        overlay
    }

    /// All texts joined on one line, for logs.
    pub fn summary(&self) -> String {
        self.texts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("  ")
    }
}
