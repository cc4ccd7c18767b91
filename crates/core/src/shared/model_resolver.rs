use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found: {0}")]
    Missing(PathBuf),
    #[error("model {name} not found in any of: {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Resolve a model file, failing if it cannot be found locally.
///
/// Resolution order:
/// 1. Explicit path (must exist, no fallback)
/// 2. Each bundled directory, in order
/// 3. User cache directory (platform-specific)
pub fn resolve(
    explicit: Option<&Path>,
    name: &str,
    bundled_dirs: &[PathBuf],
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ModelResolveError::Missing(path.to_path_buf()));
    }

    let mut searched = Vec::with_capacity(bundled_dirs.len() + 1);
    for dir in bundled_dirs {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched.push(dir.clone());
    }

    // A missing cache dir only matters if nothing else matched
    if let Ok(cache_dir) = model_cache_dir() {
        let candidate = cache_dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched.push(cache_dir);
    }

    Err(ModelResolveError::NotFound {
        name: name.to_string(),
        searched,
    })
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Liveness Check/models/`
/// - Linux: `$XDG_CACHE_HOME/Liveness Check/models/` or `~/.cache/Liveness Check/models/`
/// - Windows: `%LOCALAPPDATA%/Liveness Check/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_is_returned() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.onnx");
        fs::write(&path, b"model").unwrap();

        let resolved = resolve(Some(&path), "ignored.onnx", &[]).unwrap();
        assert_eq!(resolved, path);
    }

    #[test]
    fn test_missing_explicit_path_does_not_fall_back() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("model.onnx"), b"model").unwrap();
        let missing = tmp.path().join("other.onnx");

        let err = resolve(Some(&missing), "model.onnx", &[tmp.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, ModelResolveError::Missing(p) if p == missing));
    }

    #[test]
    fn test_first_bundled_dir_wins() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("a");
        let second = tmp.path().join("b");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("model.onnx"), b"a").unwrap();
        fs::write(second.join("model.onnx"), b"b").unwrap();

        let resolved = resolve(None, "model.onnx", &[first.clone(), second]).unwrap();
        assert_eq!(resolved, first.join("model.onnx"));
    }

    #[test]
    fn test_not_found_lists_searched_dirs() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();

        let err = resolve(None, "no_such_model_7f3a.onnx", &[dir.clone()]).unwrap_err();
        match err {
            ModelResolveError::NotFound { name, searched } => {
                assert_eq!(name, "no_such_model_7f3a.onnx");
                assert_eq!(searched[0], dir);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_directory_named_like_model_is_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("dir_model_9c1e.onnx")).unwrap();

        let result = resolve(None, "dir_model_9c1e.onnx", &[tmp.path().to_path_buf()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_model_cache_dir_contains_app_name() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.ends_with("models"));
    }
}
