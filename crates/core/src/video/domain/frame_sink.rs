use crate::shared::frame::Frame;

/// Receives each annotated frame once the pipeline is done with it.
pub trait FrameSink: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
