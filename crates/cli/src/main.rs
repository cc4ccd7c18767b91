use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use liveness_core::annotation::infrastructure::raster_annotator::RasterAnnotator;
use liveness_core::detection::infrastructure::onnx_blazeface_locator::{
    OnnxBlazefaceLocator, DEFAULT_CONFIDENCE,
};
use liveness_core::liveness::domain::liveness_classifier::LivenessClassifier;
use liveness_core::pipeline::liveness_loop_use_case::{LivenessLoopUseCase, LoopConfig};
use liveness_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use liveness_core::pipeline::retry::RetryPolicy;
use liveness_core::scoring::domain::scoring_backend::BackendKind;
use liveness_core::scoring::infrastructure::backend_factory::{
    create_backend, default_model_name, BackendOptions,
};
use liveness_core::shared::config::{AlignmentConfig, LivenessSettings};
use liveness_core::shared::constants::{
    ALIGNMENT_CONFIG_FILE, ALIGNMENT_ROOT, BLAZEFACE_MODEL_NAME, DEFAULT_CAMERA_DEVICE,
};
use liveness_core::shared::model_resolver;
use liveness_core::video::domain::frame_source::SourceSpec;
use liveness_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use liveness_core::video::infrastructure::png_frame_sink::PngFrameSink;

/// Scores every camera frame for face liveness. Type `q` then Enter to stop.
#[derive(Parser, Debug)]
#[command(name = "liveness-check")]
struct Cli {
    /// Capture device to read from.
    #[arg(long, default_value = DEFAULT_CAMERA_DEVICE)]
    camera: String,

    /// Read a recorded video instead of the camera.
    #[arg(long, conflicts_with = "camera")]
    input: Option<PathBuf>,

    /// JSON settings file; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scoring backend: graph or onnx.
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Anti-spoofing model file (default: looked up by backend).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Output the graph backend reads scores from.
    #[arg(long)]
    graph_output: Option<String>,

    /// BlazeFace model file.
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Minimum BlazeFace confidence (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    detector_confidence: f64,

    /// Liveness threshold on the rounded score (0.0-1.0).
    #[arg(long)]
    threshold: Option<f64>,

    /// Request a hardware execution provider when available.
    #[arg(long)]
    gpu: bool,

    /// Scoring input side length for models with dynamic height/width.
    #[arg(long)]
    input_size: Option<u32>,

    /// Face-alignment parameter document.
    #[arg(long)]
    alignment_config: Option<PathBuf>,

    /// Directory the alignment document's file paths are relative to.
    #[arg(long, default_value = ALIGNMENT_ROOT)]
    alignment_root: PathBuf,

    /// Save every annotated frame here as PNG.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Attempts at opening the source before giving up.
    #[arg(long)]
    open_retries: Option<u32>,

    /// Pause after the first failed open, doubled on each retry.
    #[arg(long)]
    retry_backoff_ms: Option<u64>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    validate(&cli, &settings)?;

    if let Some(alignment) = load_alignment(&cli)? {
        log::info!(
            "Alignment model: {} ({} extra keys)",
            alignment.checkpoint_fp.display(),
            alignment.extra.len()
        );
    }

    let classifier = build_classifier(&cli, &settings)?;
    let locator = build_locator(&cli, &settings)?;

    let mut use_case = LivenessLoopUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(locator),
        classifier,
        Box::new(RasterAnnotator::new()),
        Box::new(StdoutPipelineLogger::default()),
    );
    if let Some(dir) = &cli.output_dir {
        use_case = use_case.with_sink(Box::new(PngFrameSink::new(dir)?));
    }

    let spec = match &cli.input {
        Some(path) => SourceSpec::File(path.clone()),
        None => SourceSpec::Camera(cli.camera.clone()),
    };
    let config = LoopConfig {
        max_frames: cli.max_frames,
        retry: RetryPolicy::new(
            settings.open_retries,
            Duration::from_millis(settings.retry_backoff_ms),
        ),
        ..LoopConfig::default()
    };
    spawn_quit_watcher(config.cancelled.clone());

    let summary = use_case.execute(&spec, &config)?;
    eprintln!(
        "Processed {} frames: {} with faces, {} live, {} degraded",
        summary.frames, summary.frames_with_faces, summary.live_frames, summary.degraded_frames
    );
    Ok(())
}

/// Settings file (or defaults) with command-line overrides applied.
fn load_settings(cli: &Cli) -> Result<LivenessSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => LivenessSettings::load(path)?,
        None => LivenessSettings::default(),
    };
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    if let Some(output) = &cli.graph_output {
        settings.graph_output = output.clone();
    }
    if let Some(threshold) = cli.threshold {
        settings.face_threshold = threshold;
    }
    if let Some(size) = cli.input_size {
        settings.input_size = size;
    }
    if let Some(retries) = cli.open_retries {
        settings.open_retries = retries;
    }
    if let Some(ms) = cli.retry_backoff_ms {
        settings.retry_backoff_ms = ms;
    }
    settings.use_gpu |= cli.gpu;
    Ok(settings)
}

fn validate(cli: &Cli, settings: &LivenessSettings) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&settings.face_threshold) {
        return Err(format!(
            "Threshold must be between 0.0 and 1.0, got {}",
            settings.face_threshold
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.detector_confidence) {
        return Err(format!(
            "Detector confidence must be between 0.0 and 1.0, got {}",
            cli.detector_confidence
        )
        .into());
    }
    if settings.input_size == 0 {
        return Err("Input size must be positive".into());
    }
    if settings.crop_margin < 0.0 {
        return Err(format!("Crop margin must be >= 0, got {}", settings.crop_margin).into());
    }
    if let Some(input) = &cli.input {
        if !input.is_file() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    Ok(())
}

/// An explicit document must load; the default one is optional.
fn load_alignment(cli: &Cli) -> Result<Option<AlignmentConfig>, Box<dyn std::error::Error>> {
    let path = match &cli.alignment_config {
        Some(path) => path.clone(),
        None => {
            let default = cli.alignment_root.join(ALIGNMENT_CONFIG_FILE);
            if !default.is_file() {
                log::debug!("No alignment config at {}", default.display());
                return Ok(None);
            }
            default
        }
    };
    let config = AlignmentConfig::load(&path, &cli.alignment_root)?;
    config.verify_files()?;
    Ok(Some(config))
}

fn model_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("models")];
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir.join("models"));
    }
    dirs
}

fn build_classifier(
    cli: &Cli,
    settings: &LivenessSettings,
) -> Result<LivenessClassifier, Box<dyn std::error::Error>> {
    let name = default_model_name(settings.backend);
    log::info!("Resolving scoring model: {name}");
    let model_path = model_resolver::resolve(cli.model.as_deref(), name, &model_dirs())?;
    let backend = create_backend(
        settings.backend,
        &model_path,
        &BackendOptions::from(settings),
    )?;
    Ok(LivenessClassifier::from_settings(backend, settings))
}

fn build_locator(
    cli: &Cli,
    settings: &LivenessSettings,
) -> Result<OnnxBlazefaceLocator, Box<dyn std::error::Error>> {
    log::info!("Resolving detector model: {BLAZEFACE_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        cli.detector_model.as_deref(),
        BLAZEFACE_MODEL_NAME,
        &model_dirs(),
    )?;
    OnnxBlazefaceLocator::new(&model_path, cli.detector_confidence, settings.use_gpu)
}

/// Sets `stop` once a line reading `q` arrives on stdin.
fn spawn_quit_watcher(stop: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if is_quit(&line) {
                stop.store(true, Ordering::Relaxed);
                break;
            }
        }
    });
}

fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}
