use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::domain::normalized_tensor::ColorOrder;
use crate::scoring::domain::scoring_backend::BackendKind;
use crate::shared::constants::{
    DEFAULT_INPUT_SIZE, FACE_CROP_MARGIN, FACE_THRESHOLD, GRAPH_OUTPUT_NAME,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config {path} is missing required key `{key}`")]
    MissingKey { path: PathBuf, key: &'static str },
    #[error("alignment file referenced by `{key}` does not exist: {path}")]
    MissingFile { key: &'static str, path: PathBuf },
}

/// Process-wide knobs for the liveness pipeline, fixed at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessSettings {
    /// Inclusive cutoff on the rounded liveness score.
    pub face_threshold: f64,
    pub backend: BackendKind,
    /// Best-effort accelerator request for every ONNX session.
    pub use_gpu: bool,
    /// Scoring input side length, used when the model leaves it dynamic.
    pub input_size: u32,
    pub color_order: ColorOrder,
    /// Output the graph backend reads its class probabilities from.
    pub graph_output: String,
    pub crop_margin: f64,
    pub open_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for LivenessSettings {
    fn default() -> Self {
        Self {
            face_threshold: FACE_THRESHOLD,
            backend: BackendKind::OnnxRuntime,
            use_gpu: false,
            input_size: DEFAULT_INPUT_SIZE,
            color_order: ColorOrder::Bgr,
            graph_output: GRAPH_OUTPUT_NAME.to_string(),
            crop_margin: FACE_CROP_MARGIN,
            open_retries: 5,
            retry_backoff_ms: 200,
        }
    }
}

impl LivenessSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Face-alignment model parameters, read once at startup.
///
/// Only the two file fields are interpreted; every other key is kept
/// verbatim for the alignment collaborator.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AlignmentConfig {
    pub bfm_fp: PathBuf,
    pub checkpoint_fp: PathBuf,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AlignmentConfig {
    /// Parses the document at `path` and joins both file fields onto `root`.
    pub fn load(path: &Path, root: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        for key in ["bfm_fp", "checkpoint_fp"] {
            if value.get(key).is_none() {
                return Err(ConfigError::MissingKey {
                    path: path.to_path_buf(),
                    key,
                });
            }
        }
        let config: AlignmentConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(config.resolved_against(root))
    }

    fn resolved_against(mut self, root: &Path) -> Self {
        self.bfm_fp = root.join(&self.bfm_fp);
        self.checkpoint_fp = root.join(&self.checkpoint_fp);
        self
    }

    /// Fails if either referenced file is absent.
    pub fn verify_files(&self) -> Result<(), ConfigError> {
        for (key, path) in [("bfm_fp", &self.bfm_fp), ("checkpoint_fp", &self.checkpoint_fp)] {
            if !path.is_file() {
                return Err(ConfigError::MissingFile {
                    key,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings_match_constants() {
        let s = LivenessSettings::default();
        assert_relative_eq!(s.face_threshold, 0.7);
        assert_eq!(s.backend, BackendKind::OnnxRuntime);
        assert!(!s.use_gpu);
        assert_eq!(s.input_size, DEFAULT_INPUT_SIZE);
        assert_eq!(s.graph_output, "sequential");
    }

    #[test]
    fn test_settings_graph_output_override() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{"graph_output": "dense_2"}"#).unwrap();

        let s = LivenessSettings::load(&path).unwrap();
        assert_eq!(s.graph_output, "dense_2");
        assert_eq!(s.backend, BackendKind::OnnxRuntime);
    }

    #[test]
    fn test_settings_partial_document_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{"face_threshold": 0.85, "backend": "graph"}"#).unwrap();

        let s = LivenessSettings::load(&path).unwrap();
        assert_relative_eq!(s.face_threshold, 0.85);
        assert_eq!(s.backend, BackendKind::Graph);
        assert_eq!(s.open_retries, LivenessSettings::default().open_retries);
    }

    #[test]
    fn test_settings_missing_file_is_read_error() {
        let err = LivenessSettings::load(Path::new("/nonexistent/settings.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_alignment_paths_resolved_against_root() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mb1_120x120.json");
        fs::write(
            &path,
            r#"{"arch": "mobilenet", "bfm_fp": "configs/bfm_noneck_v3.pkl",
               "checkpoint_fp": "weights/mb1_120x120.pth", "size": 120}"#,
        )
        .unwrap();

        let cfg = AlignmentConfig::load(&path, Path::new("face_det")).unwrap();
        assert_eq!(cfg.bfm_fp, PathBuf::from("face_det/configs/bfm_noneck_v3.pkl"));
        assert_eq!(cfg.checkpoint_fp, PathBuf::from("face_det/weights/mb1_120x120.pth"));
        assert_eq!(cfg.extra["arch"], "mobilenet");
        assert_eq!(cfg.extra["size"], 120);
    }

    #[test]
    fn test_alignment_absolute_path_is_kept() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cfg.json");
        fs::write(&path, r#"{"bfm_fp": "/opt/bfm.pkl", "checkpoint_fp": "w.pth"}"#).unwrap();

        let cfg = AlignmentConfig::load(&path, Path::new("face_det")).unwrap();
        assert_eq!(cfg.bfm_fp, PathBuf::from("/opt/bfm.pkl"));
    }

    #[test]
    fn test_alignment_missing_key() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cfg.json");
        fs::write(&path, r#"{"bfm_fp": "bfm.pkl"}"#).unwrap();

        let err = AlignmentConfig::load(&path, tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: "checkpoint_fp", .. }));
    }

    #[test]
    fn test_alignment_malformed_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cfg.json");
        fs::write(&path, "bfm_fp: [").unwrap();

        let err = AlignmentConfig::load(&path, tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_verify_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cfg.json");
        fs::write(&path, r#"{"bfm_fp": "bfm.pkl", "checkpoint_fp": "w.pth"}"#).unwrap();
        let cfg = AlignmentConfig::load(&path, tmp.path()).unwrap();

        assert!(matches!(
            cfg.verify_files(),
            Err(ConfigError::MissingFile { key: "bfm_fp", .. })
        ));

        fs::write(tmp.path().join("bfm.pkl"), b"").unwrap();
        fs::write(tmp.path().join("w.pth"), b"").unwrap();
        assert!(cfg.verify_files().is_ok());
    }
}
