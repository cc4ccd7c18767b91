use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Six BlazeFace keypoints in frame pixels: right eye, left eye, nose tip,
/// mouth center, right ear tragion, left ear tragion.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceKeypoints {
    pub points: [(f32, f32); 6],
}

/// Everything a locator found in one frame.
///
/// `keypoints` is auxiliary pose data aligned index-for-index with
/// `boxes`; the liveness path reads only `boxes`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detections {
    pub boxes: Vec<BoundingBox>,
    pub keypoints: Vec<FaceKeypoints>,
}

impl Detections {
    pub fn from_boxes(boxes: Vec<BoundingBox>) -> Self {
        Self {
            boxes,
            keypoints: Vec::new(),
        }
    }

    pub fn face_count(&self) -> usize {
        self.boxes.len()
    }
}

/// Domain interface for finding candidate faces in a frame.
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Detections, Box<dyn std::error::Error>>;
}
