/// Channel-last scoring engine.
///
/// Runs the anti-spoofing graph in its native `[N, H, W, C]` form, binding
/// the single image input by name and reading back one named output.
use std::path::Path;

use crate::scoring::domain::normalized_tensor::{InputSpec, NormalizedTensor, TensorLayout};
use crate::scoring::domain::score_vector::ScoreVector;
use crate::scoring::domain::scoring_backend::{
    check_tensor, BackendKind, ScoringBackend, ScoringError,
};
use crate::shared::execution_provider::load_session;

use super::backend_factory::{BackendLoadError, BackendOptions};
use super::session_io::{declared_input_size, first_input_dims, scores_from_output};

pub struct GraphBackend {
    session: ort::session::Session,
    input_name: String,
    output_name: String,
    spec: InputSpec,
}

impl GraphBackend {
    /// Load the graph and resolve its input size from the declared shape.
    ///
    /// `options.graph_output` names the prediction head and must be one of
    /// the declared outputs.
    pub fn new(model_path: &Path, options: &BackendOptions) -> Result<Self, BackendLoadError> {
        let session =
            load_session(model_path, options.use_gpu).map_err(|e| BackendLoadError::Session {
                path: model_path.to_path_buf(),
                source: e,
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| BackendLoadError::NoInputs(model_path.to_path_buf()))?;

        let declared: Vec<&str> = session.outputs().iter().map(|o| o.name()).collect();
        let output_name = select_output(&declared, &options.graph_output, model_path)?;

        let size = resolve_size(&session, model_path, TensorLayout::ChannelsLast, options)?;
        log::info!(
            "Graph backend ready: input `{}` {}x{} NHWC, output `{}`",
            input_name,
            size,
            size,
            output_name
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            spec: InputSpec {
                layout: TensorLayout::ChannelsLast,
                size,
                color_order: options.color_order,
            },
        })
    }
}

/// The configured head, provided the model declares it.
fn select_output(
    declared: &[&str],
    wanted: &str,
    model_path: &Path,
) -> Result<String, BackendLoadError> {
    if declared.is_empty() {
        return Err(BackendLoadError::NoOutputs(model_path.to_path_buf()));
    }
    if !declared.contains(&wanted) {
        return Err(BackendLoadError::UnknownOutput {
            path: model_path.to_path_buf(),
            name: wanted.to_string(),
        });
    }
    Ok(wanted.to_string())
}

/// Declared size when fixed, otherwise the configured fallback.
pub(super) fn resolve_size(
    session: &ort::session::Session,
    model_path: &Path,
    layout: TensorLayout,
    options: &BackendOptions,
) -> Result<u32, BackendLoadError> {
    let dims = first_input_dims(session)
        .ok_or_else(|| BackendLoadError::NoInputs(model_path.to_path_buf()))?;
    match declared_input_size(&dims, layout) {
        Ok(Some(size)) => {
            if size != options.input_size {
                log::debug!(
                    "Model declares input size {size}, overriding configured {}",
                    options.input_size
                );
            }
            Ok(size)
        }
        Ok(None) => Ok(options.input_size),
        Err(dims) => Err(BackendLoadError::UnexpectedInput {
            path: model_path.to_path_buf(),
            layout,
            dims,
        }),
    }
}

impl ScoringBackend for GraphBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Graph
    }

    fn input_spec(&self) -> InputSpec {
        self.spec
    }

    fn score(&mut self, tensor: NormalizedTensor) -> Result<ScoreVector, ScoringError> {
        check_tensor(&self.spec, &tensor)?;

        let input_value = ort::value::Tensor::from_array(tensor.into_array())?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])?;
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ScoringError::MissingOutput(self.output_name.clone()))?;
        scores_from_output(output.try_extract_array::<f32>()?)
    }
}
