use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scoring::domain::normalized_tensor::{ColorOrder, TensorLayout};
use crate::scoring::domain::scoring_backend::{BackendKind, ScoringBackend};
use crate::shared::config::LivenessSettings;
use crate::shared::constants::{GRAPH_MODEL_NAME, RUNTIME_MODEL_NAME};

use super::graph_backend::GraphBackend;
use super::runtime_backend::RuntimeBackend;

/// Startup failure while bringing up a scoring backend. Always fatal.
#[derive(Error, Debug)]
pub enum BackendLoadError {
    #[error("scoring model not found: {0}")]
    ModelMissing(PathBuf),
    #[error("failed to load scoring model {path}: {source}")]
    Session {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },
    #[error("scoring model {0} declares no inputs")]
    NoInputs(PathBuf),
    #[error("scoring model {0} declares no outputs")]
    NoOutputs(PathBuf),
    #[error("scoring model {path} has no output named `{name}`")]
    UnknownOutput { path: PathBuf, name: String },
    #[error("scoring model {path} input {dims:?} is not a square 3-channel {layout:?} image")]
    UnexpectedInput {
        path: PathBuf,
        layout: TensorLayout,
        dims: Vec<i64>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct BackendOptions {
    pub use_gpu: bool,
    /// Used only when the model leaves height/width dynamic.
    pub input_size: u32,
    pub color_order: ColorOrder,
    /// Graph backend only.
    pub graph_output: String,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self::from(&LivenessSettings::default())
    }
}

impl From<&LivenessSettings> for BackendOptions {
    fn from(settings: &LivenessSettings) -> Self {
        Self {
            use_gpu: settings.use_gpu,
            input_size: settings.input_size,
            color_order: settings.color_order,
            graph_output: settings.graph_output.clone(),
        }
    }
}

/// Default model file name for each backend.
pub fn default_model_name(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Graph => GRAPH_MODEL_NAME,
        BackendKind::OnnxRuntime => RUNTIME_MODEL_NAME,
    }
}

/// Loads the selected backend once, at startup.
///
/// The returned trait object is the only thing the classifier sees, so
/// nothing downstream branches on the backend kind.
pub fn create_backend(
    kind: BackendKind,
    model_path: &Path,
    options: &BackendOptions,
) -> Result<Box<dyn ScoringBackend>, BackendLoadError> {
    if !model_path.is_file() {
        return Err(BackendLoadError::ModelMissing(model_path.to_path_buf()));
    }
    log::info!("Loading {} scoring backend from {}", kind, model_path.display());
    match kind {
        BackendKind::Graph => Ok(Box::new(GraphBackend::new(model_path, options)?)),
        BackendKind::OnnxRuntime => Ok(Box::new(RuntimeBackend::new(model_path, options)?)),
    }
}
