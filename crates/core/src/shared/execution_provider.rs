/// Execution providers to register on an ONNX session.
///
/// `use_gpu` is a best-effort hint: the platform accelerator is requested
/// and ONNX Runtime silently falls back to CPU when it is unavailable.
pub fn preferred_execution_providers(
    use_gpu: bool,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    if !use_gpu {
        return vec![];
    }
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        log::info!("No accelerator execution provider on this platform, using CPU");
        vec![]
    }
}

/// Opens an ONNX session from disk with the preferred providers.
pub fn load_session(
    model_path: &std::path::Path,
    use_gpu: bool,
) -> Result<ort::session::Session, ort::Error> {
    let session = ort::session::Session::builder()?
        .with_execution_providers(preferred_execution_providers(use_gpu))?
        .commit_from_file(model_path)?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_only_registers_no_providers() {
        assert!(preferred_execution_providers(false).is_empty());
    }

    #[test]
    fn test_load_session_missing_file_fails() {
        let result = load_session(std::path::Path::new("/nonexistent/model.onnx"), false);
        assert!(result.is_err());
    }
}
