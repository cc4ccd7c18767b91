//! Helpers shared by the ONNX-backed scoring engines: reading the
//! declared input geometry and turning a raw output into a [`ScoreVector`].

use ndarray::{ArrayViewD, Axis};

use crate::scoring::domain::normalized_tensor::TensorLayout;
use crate::scoring::domain::score_vector::ScoreVector;
use crate::scoring::domain::scoring_backend::ScoringError;

/// Square input side declared by a 4-D image input.
///
/// Returns `Ok(None)` when height/width are dynamic, and `Err` with the
/// offending dims when the input is not a 3-channel image in `layout`.
pub fn declared_input_size(dims: &[i64], layout: TensorLayout) -> Result<Option<u32>, Vec<i64>> {
    if dims.len() != 4 {
        return Err(dims.to_vec());
    }
    let (channels, height, width) = match layout {
        TensorLayout::ChannelsLast => (dims[3], dims[1], dims[2]),
        TensorLayout::ChannelsFirst => (dims[1], dims[2], dims[3]),
    };
    // Negative dims are symbolic
    if channels > 0 && channels != 3 {
        return Err(dims.to_vec());
    }
    match (height > 0, width > 0) {
        (true, true) if height == width => Ok(Some(height as u32)),
        (true, true) => Err(dims.to_vec()),
        (true, false) => Ok(Some(height as u32)),
        (false, true) => Ok(Some(width as u32)),
        (false, false) => Ok(None),
    }
}

/// Dims of the first input, if it is a tensor.
pub fn first_input_dims(session: &ort::session::Session) -> Option<Vec<i64>> {
    session.inputs().first().and_then(|input| {
        if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
            Some(shape.iter().copied().collect())
        } else {
            None
        }
    })
}

/// Takes the first batch row of a `[N, classes]` (or flat) output.
pub fn scores_from_output(output: ArrayViewD<'_, f32>) -> Result<ScoreVector, ScoringError> {
    let row: Vec<f32> = if output.ndim() >= 2 {
        if output.len_of(Axis(0)) == 0 {
            return Err(ScoringError::MalformedOutput { classes: 0 });
        }
        output.index_axis(Axis(0), 0).iter().copied().collect()
    } else {
        output.iter().copied().collect()
    };
    ScoreVector::new(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2, ArrayD, IxDyn};
    use rstest::rstest;

    #[rstest]
    #[case::nhwc_fixed(&[1, 224, 224, 3], TensorLayout::ChannelsLast, Some(224))]
    #[case::nchw_fixed(&[1, 3, 80, 80], TensorLayout::ChannelsFirst, Some(80))]
    #[case::nhwc_dynamic(&[-1, -1, -1, 3], TensorLayout::ChannelsLast, None)]
    #[case::nchw_dynamic_batch(&[-1, 3, 128, 128], TensorLayout::ChannelsFirst, Some(128))]
    #[case::half_dynamic(&[1, 3, -1, 96], TensorLayout::ChannelsFirst, Some(96))]
    fn test_declared_input_size(
        #[case] dims: &[i64],
        #[case] layout: TensorLayout,
        #[case] expected: Option<u32>,
    ) {
        assert_eq!(declared_input_size(dims, layout).unwrap(), expected);
    }

    #[rstest]
    #[case::wrong_rank(&[1, 224, 224], TensorLayout::ChannelsLast)]
    #[case::nchw_read_as_nhwc(&[1, 3, 224, 224], TensorLayout::ChannelsLast)]
    #[case::nhwc_read_as_nchw(&[1, 224, 224, 3], TensorLayout::ChannelsFirst)]
    #[case::not_square(&[1, 3, 224, 112], TensorLayout::ChannelsFirst)]
    fn test_declared_input_size_rejects(#[case] dims: &[i64], #[case] layout: TensorLayout) {
        assert_eq!(declared_input_size(dims, layout).unwrap_err(), dims.to_vec());
    }

    #[test]
    fn test_scores_from_batch_output() {
        let out = arr2(&[[0.35f32, 0.65]]).into_dyn();
        let scores = scores_from_output(out.view()).unwrap();
        assert_relative_eq!(scores.liveness(), 0.65, epsilon = 1e-6);
    }

    #[test]
    fn test_scores_from_flat_output() {
        let out = arr1(&[0.05f32, 0.95]).into_dyn();
        let scores = scores_from_output(out.view()).unwrap();
        assert_eq!(scores.probabilities(), &[0.05, 0.95]);
    }

    #[test]
    fn test_scores_uses_first_batch_row() {
        let out = arr2(&[[0.9f32, 0.1], [0.2, 0.8]]).into_dyn();
        let scores = scores_from_output(out.view()).unwrap();
        assert_eq!(scores.probabilities(), &[0.9, 0.1]);
    }

    #[test]
    fn test_empty_batch_is_malformed() {
        let out = ArrayD::<f32>::zeros(IxDyn(&[0, 2]));
        assert!(matches!(
            scores_from_output(out.view()),
            Err(ScoringError::MalformedOutput { classes: 0 })
        ));
    }
}
