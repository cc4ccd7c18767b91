use crate::annotation::domain::overlay::Overlay;
use crate::shared::frame::Frame;

/// Renders an [`Overlay`] onto a frame in place.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &mut Frame,
        overlay: &Overlay,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
