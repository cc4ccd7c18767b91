/// BlazeFace face locator using ONNX Runtime via `ort`.
///
/// Produces face boxes plus the six BlazeFace keypoints per face. No
/// tracking: every frame is located from scratch.
use std::path::Path;

use crate::detection::domain::face_locator::{Detections, FaceKeypoints, FaceLocator};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::execution_provider::load_session;
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: 4 box + 6 * 2 keypoints.
const REG_STRIDE: usize = 16;

const NUM_KEYPOINTS: usize = 6;

pub struct OnnxBlazefaceLocator {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceLocator {
    pub fn new(
        model_path: &Path,
        confidence: f64,
        use_gpu: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path, use_gpu)?;
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceLocator for OnnxBlazefaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Detections, Box<dyn std::error::Error>> {
        // 1. Preprocess: resize to 128x128, normalize to [0,1], NCHW
        let input_tensor = preprocess(frame, INPUT_SIZE);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        // 3. Decode + NMS
        let mut raw = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence as f32,
            frame.width(),
            frame.height(),
        );
        Ok(nms(&mut raw, NMS_IOU_THRESH))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    ndarray::Array4::from_shape_fn((1, 3, s, s), |(_, c, y, x)| {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
        src[[src_y, src_x, c]] as f32 / 255.0
    })
}

// ---------------------------------------------------------------------------
// Anchors and decoding
// ---------------------------------------------------------------------------

/// Short-range anchors: 16×16 grid with 2 per cell, then 8×8 with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

#[derive(Clone, Debug)]
struct RawFace {
    bbox: BoundingBox,
    keypoints: FaceKeypoints,
    score: f32,
}

fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    fw: u32,
    fh: u32,
) -> Vec<RawFace> {
    let (fw_f, fh_f) = (fw as f32, fh as f32);
    let scale = INPUT_SIZE as f32;
    let mut faces = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }
        let off = i * REG_STRIDE;
        if off + REG_STRIDE > reg_data.len() {
            break;
        }
        let anchor = anchors[i];

        let cx = anchor[0] + reg_data[off] / scale;
        let cy = anchor[1] + reg_data[off + 1] / scale;
        let w = reg_data[off + 2] / scale;
        let h = reg_data[off + 3] / scale;

        let x1 = ((cx - w / 2.0) * fw_f).max(0.0);
        let y1 = ((cy - h / 2.0) * fh_f).max(0.0);
        let x2 = ((cx + w / 2.0) * fw_f).min(fw_f);
        let y2 = ((cy + h / 2.0) * fh_f).min(fh_f);
        let bbox = BoundingBox::from_corners(x1 as i32, y1 as i32, x2 as i32, y2 as i32);
        if bbox.is_empty() {
            continue;
        }

        let mut points = [(0.0f32, 0.0f32); NUM_KEYPOINTS];
        for (k, point) in points.iter_mut().enumerate() {
            let kx = anchor[0] + reg_data[off + 4 + 2 * k] / scale;
            let ky = anchor[1] + reg_data[off + 5 + 2 * k] / scale;
            *point = (kx * fw_f, ky * fh_f);
        }

        faces.push(RawFace {
            bbox,
            keypoints: FaceKeypoints { points },
            score,
        });
    }
    faces
}

/// Greedy NMS; survivors are returned in descending score order.
fn nms(faces: &mut [RawFace], iou_thresh: f64) -> Detections {
    faces.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut detections = Detections::default();
    let mut suppressed = vec![false; faces.len()];

    for i in 0..faces.len() {
        if suppressed[i] {
            continue;
        }
        detections.boxes.push(faces[i].bbox);
        detections.keypoints.push(faces[i].keypoints.clone());
        for j in (i + 1)..faces.len() {
            if !suppressed[j] && faces[i].bbox.iou(&faces[j].bbox) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    detections
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x1: i32, y1: i32, x2: i32, y2: i32, score: f32) -> RawFace {
        RawFace {
            bbox: BoundingBox::from_corners(x1, y1, x2, y2),
            keypoints: FaceKeypoints {
                points: [(0.0, 0.0); NUM_KEYPOINTS],
            },
            score,
        }
    }

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let tensor = preprocess(&frame, 128);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized() {
        let frame = Frame::new(vec![255u8; 50 * 50 * 3], 50, 50, 3, 0);
        let tensor = preprocess(&frame, 128);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_generate_anchors_count() {
        // 16×16 × 2 + 8×8 × 6 = 512 + 384
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!((sigmoid(10.0) - 1.0).abs() < 0.001);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_decode_box_and_keypoints() {
        let anchors = vec![[0.5f32, 0.5f32]];
        let mut reg = vec![0.0f32; REG_STRIDE];
        // 64 px wide/high in model space -> half the frame
        reg[2] = 64.0;
        reg[3] = 64.0;
        // first keypoint 32 px right of the anchor
        reg[4] = 32.0;
        let faces = decode(&reg, &[10.0], &anchors, 0.5, 200, 100);

        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bbox, BoundingBox::from_corners(50, 25, 150, 75));
        assert_eq!(faces[0].keypoints.points[0], (150.0, 50.0));
        assert_eq!(faces[0].keypoints.points[1], (100.0, 50.0));
    }

    #[test]
    fn test_decode_skips_low_confidence() {
        let anchors = vec![[0.5f32, 0.5f32]];
        let mut reg = vec![0.0f32; REG_STRIDE];
        reg[2] = 64.0;
        reg[3] = 64.0;
        assert!(decode(&reg, &[-10.0], &anchors, 0.5, 200, 100).is_empty());
    }

    #[test]
    fn test_decode_clamps_to_frame() {
        let anchors = vec![[0.0f32, 0.0f32]];
        let mut reg = vec![0.0f32; REG_STRIDE];
        reg[2] = 64.0;
        reg[3] = 64.0;
        let faces = decode(&reg, &[10.0], &anchors, 0.5, 200, 100);
        assert_eq!(faces[0].bbox, BoundingBox::from_corners(0, 0, 50, 25));
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let mut faces = vec![raw(5, 5, 105, 105, 0.7), raw(0, 0, 100, 100, 0.9)];
        let dets = nms(&mut faces, 0.3);
        assert_eq!(dets.boxes, vec![BoundingBox::from_corners(0, 0, 100, 100)]);
        assert_eq!(dets.keypoints.len(), 1);
    }

    #[test]
    fn test_nms_keeps_separate() {
        let mut faces = vec![raw(0, 0, 50, 50, 0.9), raw(200, 200, 250, 250, 0.8)];
        let dets = nms(&mut faces, 0.3);
        assert_eq!(dets.face_count(), 2);
    }
}
