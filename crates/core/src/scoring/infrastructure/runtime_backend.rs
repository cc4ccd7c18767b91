/// Channel-first scoring engine.
///
/// Targets the permuted export of the anti-spoofing model (`[N, C, H, W]`
/// input). Inputs are fed by pairing the session's declared input names,
/// in order, with the supplied tensors; the first declared output is the
/// prediction.
use std::path::Path;

use crate::scoring::domain::normalized_tensor::{InputSpec, NormalizedTensor, TensorLayout};
use crate::scoring::domain::score_vector::ScoreVector;
use crate::scoring::domain::scoring_backend::{
    check_tensor, BackendKind, ScoringBackend, ScoringError,
};
use crate::shared::execution_provider::load_session;

use super::backend_factory::{BackendLoadError, BackendOptions};
use super::graph_backend::resolve_size;
use super::session_io::scores_from_output;

pub struct RuntimeBackend {
    session: ort::session::Session,
    input_names: Vec<String>,
    output_name: String,
    spec: InputSpec,
}

impl RuntimeBackend {
    pub fn new(model_path: &Path, options: &BackendOptions) -> Result<Self, BackendLoadError> {
        let session =
            load_session(model_path, options.use_gpu).map_err(|e| BackendLoadError::Session {
                path: model_path.to_path_buf(),
                source: e,
            })?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        if input_names.is_empty() {
            return Err(BackendLoadError::NoInputs(model_path.to_path_buf()));
        }
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| BackendLoadError::NoOutputs(model_path.to_path_buf()))?;

        let size = resolve_size(&session, model_path, TensorLayout::ChannelsFirst, options)?;
        log::info!(
            "Runtime backend ready: inputs {:?} {}x{} NCHW, output `{}`",
            input_names,
            size,
            size,
            output_name
        );

        Ok(Self {
            session,
            input_names,
            output_name,
            spec: InputSpec {
                layout: TensorLayout::ChannelsFirst,
                size,
                color_order: options.color_order,
            },
        })
    }

    /// Scores a multi-input model; tensors are matched to inputs by position.
    pub fn score_inputs(
        &mut self,
        tensors: Vec<NormalizedTensor>,
    ) -> Result<ScoreVector, ScoringError> {
        let feed = build_feed(&self.input_names, tensors)?;
        let mut values = Vec::with_capacity(feed.len());
        for (name, tensor) in feed {
            let value = ort::value::Tensor::from_array(tensor.into_array())?;
            values.push((name, value.into_dyn()));
        }

        let outputs = self.session.run(values)?;
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ScoringError::MissingOutput(self.output_name.clone()))?;
        scores_from_output(output.try_extract_array::<f32>()?)
    }
}

/// Pairs declared input names, in order, with the supplied tensors.
pub fn build_feed(
    input_names: &[String],
    tensors: Vec<NormalizedTensor>,
) -> Result<Vec<(String, NormalizedTensor)>, ScoringError> {
    if input_names.len() != tensors.len() {
        return Err(ScoringError::InputCount {
            declared: input_names.len(),
            supplied: tensors.len(),
        });
    }
    Ok(input_names.iter().cloned().zip(tensors).collect())
}

impl ScoringBackend for RuntimeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OnnxRuntime
    }

    fn input_spec(&self) -> InputSpec {
        self.spec
    }

    fn score(&mut self, tensor: NormalizedTensor) -> Result<ScoreVector, ScoringError> {
        check_tensor(&self.spec, &tensor)?;
        self.score_inputs(vec![tensor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn tensor(fill: f32) -> NormalizedTensor {
        NormalizedTensor::new(
            Array4::from_elem((1, 3, 2, 2), fill),
            TensorLayout::ChannelsFirst,
        )
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_feed_maps_single_input() {
        let feed = build_feed(&names(&["permute_input"]), vec![tensor(0.5)]).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].0, "permute_input");
        assert_eq!(feed[0].1, tensor(0.5));
    }

    #[test]
    fn test_feed_preserves_declared_order() {
        let feed = build_feed(&names(&["a", "b"]), vec![tensor(0.1), tensor(0.9)]).unwrap();
        assert_eq!(feed[0].0, "a");
        assert_eq!(feed[0].1, tensor(0.1));
        assert_eq!(feed[1].0, "b");
        assert_eq!(feed[1].1, tensor(0.9));
    }

    #[test]
    fn test_feed_count_mismatch() {
        let err = build_feed(&names(&["a", "b"]), vec![tensor(0.0)]).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::InputCount {
                declared: 2,
                supplied: 1
            }
        ));
    }

    #[test]
    fn test_missing_model_fails_to_load() {
        let options = BackendOptions::default();
        let result = RuntimeBackend::new(Path::new("/nonexistent/permuted.onnx"), &options);
        assert!(matches!(result, Err(BackendLoadError::Session { .. })));
    }
}
