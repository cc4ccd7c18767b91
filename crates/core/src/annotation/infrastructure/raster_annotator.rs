use ndarray::{s, ArrayViewMut3};

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::annotation::domain::overlay::{Overlay, OverlayTone};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Outline thickness for the selected face, in pixels.
const BOX_THICKNESS: i32 = 2;

/// Status strip geometry. Each overlay text becomes one strip whose width
/// grows with the text length.
const STRIP_HEIGHT: usize = 12;
const STRIP_GAP: usize = 4;
const STRIP_MARGIN: usize = 10;
const STRIP_PX_PER_CHAR: usize = 6;

/// Draws overlays straight into the frame's pixel buffer.
///
/// There is no font rendering: texts are shown as tone-colored status
/// strips in the top-left corner and the face gets a rectangle outline.
#[derive(Default)]
pub struct RasterAnnotator;

impl RasterAnnotator {
    pub fn new() -> Self {
        Self
    }

    pub fn tone_color(tone: OverlayTone) -> [u8; 3] {
        match tone {
            OverlayTone::Info => [200, 0, 0],
            OverlayTone::NotLive => [200, 0, 0],
            OverlayTone::Live => [0, 200, 0],
            OverlayTone::Face => [0, 0, 255],
        }
    }
}

impl FrameAnnotator for RasterAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        overlay: &Overlay,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("cannot annotate {}-channel frame", frame.channels()).into());
        }
        let (fw, fh) = (frame.width(), frame.height());
        let mut pixels = frame.as_ndarray_mut();

        for (i, text) in overlay.texts.iter().enumerate() {
            let top = STRIP_MARGIN + i * (STRIP_HEIGHT + STRIP_GAP);
            let strip = BoundingBox::new(
                top as i32,
                STRIP_MARGIN as i32,
                (top + STRIP_HEIGHT) as i32,
                (STRIP_MARGIN + text.text.len() * STRIP_PX_PER_CHAR) as i32,
            );
            fill(&mut pixels, &strip.clamp_to(fw, fh), Self::tone_color(text.tone));
        }

        if let Some(face) = overlay.face_box {
            let color = Self::tone_color(OverlayTone::Face);
            let t = BOX_THICKNESS;
            let edges = [
                BoundingBox::new(face.top, face.left, face.top + t, face.right),
                BoundingBox::new(face.bottom - t, face.left, face.bottom, face.right),
                BoundingBox::new(face.top, face.left, face.bottom, face.left + t),
                BoundingBox::new(face.top, face.right - t, face.bottom, face.right),
            ];
            for edge in edges {
                fill(&mut pixels, &edge.clamp_to(fw, fh), color);
            }
        }
        Ok(())
    }
}

/// Paints a box that is already clamped to the frame.
fn fill(pixels: &mut ArrayViewMut3<'_, u8>, area: &BoundingBox, color: [u8; 3]) {
    if area.is_empty() {
        return;
    }
    let mut roi = pixels.slice_mut(s![
        area.top as usize..area.bottom as usize,
        area.left as usize..area.right as usize,
        ..
    ]);
    for mut px in roi.rows_mut() {
        px[0] = color[0];
        px[1] = color[1];
        px[2] = color[2];
    }
}
