/// Rounded liveness score at or above which a face counts as live.
pub const FACE_THRESHOLD: f64 = 0.7;

/// Position of the genuine-face probability in a score vector.
pub const LIVE_CLASS_INDEX: usize = 1;

/// Decimal places kept when reporting a liveness score.
pub const SCORE_DECIMALS: i32 = 3;

/// Channel-last anti-spoofing export, used by the graph backend.
pub const GRAPH_MODEL_NAME: &str = "antispoofing.onnx";

/// Prediction head read by the graph backend.
pub const GRAPH_OUTPUT_NAME: &str = "sequential";

/// Channel-first export with a leading permute layer, used by the runtime backend.
pub const RUNTIME_MODEL_NAME: &str = "permuted_antispoofing.onnx";

pub const BLAZEFACE_MODEL_NAME: &str = "blazeface.onnx";

/// Scoring input side length when the model leaves height/width dynamic.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Fraction of the face box added on each side before cropping.
pub const FACE_CROP_MARGIN: f64 = 0.2;

/// Directory that relative alignment-model paths are resolved against.
pub const ALIGNMENT_ROOT: &str = "face_det";

/// Alignment parameter document, relative to [`ALIGNMENT_ROOT`].
pub const ALIGNMENT_CONFIG_FILE: &str = "configs/mb1_120x120.json";

pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

/// Directory name used under the platform cache dir.
pub const APP_DIR_NAME: &str = "Liveness Check";

/// Consecutive failed reads after which the capture loop gives up.
pub const MAX_CONSECUTIVE_READ_ERRORS: usize = 30;

/// Frames between info-level status lines in the CLI log.
pub const STATUS_LOG_INTERVAL: usize = 30;
