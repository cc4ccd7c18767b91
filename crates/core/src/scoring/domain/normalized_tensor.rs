use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    #[error("face box {bbox:?} has no overlap with the {width}x{height} frame")]
    EmptyCrop {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },
    #[error("frame has {0} channels, expected 3")]
    UnsupportedChannels(u8),
    #[error("normalized tensor shape {actual:?} does not match backend input {expected:?}")]
    ShapeMismatch {
        expected: [usize; 4],
        actual: Vec<usize>,
    },
}

/// Axis order a scoring backend accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[N, H, W, C]`
    ChannelsLast,
    /// `[N, C, H, W]`
    ChannelsFirst,
}

/// Channel order of the values fed to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    Rgb,
    Bgr,
}

/// What a backend declares it accepts: batch of one square color image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSpec {
    pub layout: TensorLayout,
    pub size: u32,
    pub color_order: ColorOrder,
}

impl InputSpec {
    pub fn shape(&self) -> [usize; 4] {
        let s = self.size as usize;
        match self.layout {
            TensorLayout::ChannelsLast => [1, s, s, 3],
            TensorLayout::ChannelsFirst => [1, 3, s, s],
        }
    }
}

/// A face crop scaled to `[0, 1]`, ready for exactly one scoring call.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedTensor {
    data: Array4<f32>,
    layout: TensorLayout,
}

impl NormalizedTensor {
    pub fn new(data: Array4<f32>, layout: TensorLayout) -> Self {
        Self { data, layout }
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }
}

/// Crops the face region, resizes it to the backend's input size, scales to
/// `[0, 1]` and lays the axes out the way the backend expects.
pub struct Normalizer {
    margin: f64,
}

impl Normalizer {
    pub fn new(margin: f64) -> Self {
        Self { margin }
    }

    pub fn normalize(
        &self,
        frame: &Frame,
        bbox: &BoundingBox,
        spec: &InputSpec,
    ) -> Result<NormalizedTensor, NormalizeError> {
        if frame.channels() != 3 {
            return Err(NormalizeError::UnsupportedChannels(frame.channels()));
        }
        let crop = bbox
            .expand(self.margin)
            .clamp_to(frame.width(), frame.height());
        if crop.is_empty() {
            return Err(NormalizeError::EmptyCrop {
                bbox: *bbox,
                width: frame.width(),
                height: frame.height(),
            });
        }

        let resized = crop_and_resize(frame, &crop, spec.size);
        let s = spec.size as usize;
        let channel_map = match spec.color_order {
            ColorOrder::Rgb => [0, 1, 2],
            ColorOrder::Bgr => [2, 1, 0],
        };

        let hwc = Array4::from_shape_fn((1, s, s, 3), |(_, y, x, c)| {
            resized.get_pixel(x as u32, y as u32)[channel_map[c]] as f32 / 255.0
        });
        let data = match spec.layout {
            TensorLayout::ChannelsLast => hwc,
            TensorLayout::ChannelsFirst => hwc
                .permuted_axes([0, 3, 1, 2])
                .as_standard_layout()
                .to_owned(),
        };

        if data.shape() != spec.shape() {
            return Err(NormalizeError::ShapeMismatch {
                expected: spec.shape(),
                actual: data.shape().to_vec(),
            });
        }
        Ok(NormalizedTensor::new(data, spec.layout))
    }
}

fn crop_and_resize(frame: &Frame, crop: &BoundingBox, size: u32) -> image::RgbImage {
    let px = frame.as_ndarray();
    let src = image::RgbImage::from_fn(crop.width() as u32, crop.height() as u32, |x, y| {
        let row = (crop.top as u32 + y) as usize;
        let col = (crop.left as u32 + x) as usize;
        image::Rgb([px[[row, col, 0]], px[[row, col, 1]], px[[row, col, 2]]])
    });
    image::imageops::resize(&src, size, size, image::imageops::FilterType::Triangle)
}
