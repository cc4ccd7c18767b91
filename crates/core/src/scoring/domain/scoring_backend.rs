use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::domain::normalized_tensor::{InputSpec, NormalizedTensor, TensorLayout};
use crate::scoring::domain::score_vector::ScoreVector;

/// Per-call scoring failure. Aborts the current frame only.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("tensor layout {actual:?} does not match backend layout {expected:?}")]
    LayoutMismatch {
        expected: TensorLayout,
        actual: TensorLayout,
    },
    #[error("tensor shape {actual:?} does not match backend input {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("model declares {declared} inputs but {supplied} tensors were supplied")]
    InputCount { declared: usize, supplied: usize },
    #[error("model produced no output named `{0}`")]
    MissingOutput(String),
    #[error("model output has {classes} classes, need at least 2")]
    MalformedOutput { classes: usize },
    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),
}

/// Which scoring engine to run, chosen once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Channel-last graph with a single named output.
    Graph,
    /// Channel-first runtime session fed by declared input names.
    #[serde(alias = "onnx")]
    OnnxRuntime,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Graph => write!(f, "graph"),
            BackendKind::OnnxRuntime => write!(f, "onnx"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "graph" => Ok(BackendKind::Graph),
            "onnx" | "onnx_runtime" => Ok(BackendKind::OnnxRuntime),
            other => Err(format!("unknown backend `{other}`, expected graph or onnx")),
        }
    }
}

/// Turns a normalized face tensor into class probabilities.
///
/// Models are loaded once and never change, so repeated calls with the
/// same tensor give the same scores. `&mut self` only reflects that the
/// underlying runtime handle needs exclusive access while running.
pub trait ScoringBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Tensor the backend accepts; normalization must produce exactly this.
    fn input_spec(&self) -> InputSpec;

    fn score(&mut self, tensor: NormalizedTensor) -> Result<ScoreVector, ScoringError>;
}

/// Shared pre-flight check for backend implementations.
pub fn check_tensor(spec: &InputSpec, tensor: &NormalizedTensor) -> Result<(), ScoringError> {
    if tensor.layout() != spec.layout {
        return Err(ScoringError::LayoutMismatch {
            expected: spec.layout,
            actual: tensor.layout(),
        });
    }
    if tensor.shape() != spec.shape() {
        return Err(ScoringError::ShapeMismatch {
            expected: spec.shape().to_vec(),
            actual: tensor.shape().to_vec(),
        });
    }
    Ok(())
}
