use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    /// Live capture device, e.g. `/dev/video0` or an avfoundation index.
    Camera(String),
    /// Pre-recorded video, processed once from start to end.
    File(PathBuf),
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Camera(device) => write!(f, "camera {device}"),
            SourceSpec::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// 0.0 when the source does not report a rate.
    pub fps: f64,
    pub codec: String,
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("{source_desc} unavailable after {attempts} attempts: {last_error}")]
    DeviceUnavailable {
        source_desc: String,
        attempts: u32,
        last_error: String,
    },
    #[error("{consecutive} consecutive frame reads failed: {last_error}")]
    ReadFailures {
        consecutive: usize,
        last_error: String,
    },
}

/// Yields frames in capture order, blocking until each is available.
pub trait FrameSource: Send {
    fn open(&mut self, spec: &SourceSpec) -> Result<SourceInfo, Box<dyn std::error::Error>>;

    /// `None` once the source is exhausted (never for a healthy camera).
    fn next_frame(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>>;

    /// Releases the device or file. Safe to call repeatedly.
    fn close(&mut self);
}
