use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::annotation::domain::overlay::Overlay;
use crate::detection::domain::face_locator::{Detections, FaceLocator};
use crate::liveness::domain::liveness_classifier::{FrameOutcome, LivenessClassifier};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::retry::{open_with_retry, RetryPolicy};
use crate::shared::constants::MAX_CONSECUTIVE_READ_ERRORS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::frame_source::{CaptureError, FrameSource, SourceSpec};

/// Run-time knobs for one capture session.
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Stop after this many processed frames.
    pub max_frames: Option<usize>,
    pub retry: RetryPolicy,
    /// Polled once at the end of every iteration.
    pub cancelled: Arc<AtomicBool>,
    pub max_consecutive_read_errors: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            retry: RetryPolicy::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
            max_consecutive_read_errors: MAX_CONSECUTIVE_READ_ERRORS,
        }
    }
}

/// Per-session counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: usize,
    pub frames_with_faces: usize,
    pub live_frames: usize,
    /// Frames whose detection or classification failed.
    pub degraded_frames: usize,
}

impl LoopSummary {
    fn record(&mut self, outcome: &FrameOutcome, detection_failed: bool) {
        self.frames += 1;
        if outcome.face_count() > 0 {
            self.frames_with_faces += 1;
        }
        if outcome.verdict().is_some_and(|v| v.is_live) {
            self.live_frames += 1;
        }
        if detection_failed || matches!(outcome, FrameOutcome::Degraded { .. }) {
            self.degraded_frames += 1;
        }
    }
}

enum Step {
    Processed,
    ReadFailed,
    Exhausted,
}

/// Capture → detect → classify → annotate → emit, one frame at a time.
///
/// Every collaborator is injected, so the same loop drives either scoring
/// backend and either a camera or a recorded clip. A failure inside one
/// frame degrades that frame only; the loop ends on cancellation, the frame
/// cap, source exhaustion, or a run of unreadable frames.
pub struct LivenessLoopUseCase {
    source: Box<dyn FrameSource>,
    locator: Box<dyn FaceLocator>,
    classifier: LivenessClassifier,
    annotator: Box<dyn FrameAnnotator>,
    sink: Option<Box<dyn FrameSink>>,
    logger: Box<dyn PipelineLogger>,
}

impl LivenessLoopUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        locator: Box<dyn FaceLocator>,
        classifier: LivenessClassifier,
        annotator: Box<dyn FrameAnnotator>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            locator,
            classifier,
            annotator,
            sink: None,
            logger,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Opens `spec` (retrying per `config.retry`) and runs until stopped.
    /// The source is closed on every exit path after a successful open.
    pub fn execute(
        &mut self,
        spec: &SourceSpec,
        config: &LoopConfig,
    ) -> Result<LoopSummary, Box<dyn std::error::Error>> {
        let info = open_with_retry(
            self.source.as_mut(),
            spec,
            &config.retry,
            self.logger.as_mut(),
            std::thread::sleep,
        )?;
        self.logger.info(&format!(
            "Scoring {}x{} frames with the {} backend (threshold {})",
            info.width,
            info.height,
            self.classifier.backend_kind(),
            self.classifier.policy().threshold()
        ));

        let result = self.run(config);
        self.source.close();
        self.logger.summary();
        result
    }

    fn run(&mut self, config: &LoopConfig) -> Result<LoopSummary, Box<dyn std::error::Error>> {
        let mut summary = LoopSummary::default();
        let mut consecutive_failures = 0usize;
        let mut last_error = String::new();

        loop {
            match self.step(&mut summary, &mut last_error)? {
                Step::Processed => consecutive_failures = 0,
                Step::ReadFailed => {
                    consecutive_failures += 1;
                    if consecutive_failures >= config.max_consecutive_read_errors {
                        return Err(Box::new(CaptureError::ReadFailures {
                            consecutive: consecutive_failures,
                            last_error,
                        }));
                    }
                }
                Step::Exhausted => {
                    self.logger.info("Source exhausted");
                    break;
                }
            }

            if config.cancelled.load(Ordering::Relaxed) {
                self.logger.info("Stop requested");
                break;
            }
            if config.max_frames.is_some_and(|max| summary.frames >= max) {
                break;
            }
        }

        Ok(summary)
    }

    fn step(
        &mut self,
        summary: &mut LoopSummary,
        last_error: &mut String,
    ) -> Result<Step, Box<dyn std::error::Error>> {
        let mut frame = match self.source.next_frame() {
            None => return Ok(Step::Exhausted),
            Some(Err(e)) => {
                *last_error = e.to_string();
                self.logger.warn(&format!("Frame read failed: {e}"));
                return Ok(Step::ReadFailed);
            }
            Some(Ok(frame)) => frame,
        };

        let (outcome, detection_failed) = self.process_frame(&mut frame);
        summary.record(&outcome, detection_failed);

        if let Some(sink) = self.sink.as_mut() {
            sink.write(&frame)?;
        }
        Ok(Step::Processed)
    }

    /// Detects, classifies and annotates `frame` in place.
    fn process_frame(&mut self, frame: &mut Frame) -> (FrameOutcome, bool) {
        let index = frame.index();

        let t0 = Instant::now();
        let (detections, detection_failed) = match self.locator.locate(frame) {
            Ok(d) => (d, false),
            Err(e) => {
                self.logger
                    .warn(&format!("Frame {index}: face detection failed: {e}"));
                (Detections::default(), true)
            }
        };
        self.logger.timing("detect", ms(t0.elapsed()));

        let t1 = Instant::now();
        let outcome = self.classifier.classify(frame, &detections.boxes);
        if outcome.face_count() > 0 {
            self.logger.timing("score", ms(t1.elapsed()));
        }
        if let FrameOutcome::Degraded { error, .. } = &outcome {
            self.logger
                .warn(&format!("Frame {index}: liveness unavailable: {error}"));
        }

        let overlay = Overlay::from_outcome(&outcome);
        let t2 = Instant::now();
        if let Err(e) = self.annotator.annotate(frame, &overlay) {
            self.logger
                .warn(&format!("Frame {index}: annotation failed: {e}"));
        }
        self.logger.timing("annotate", ms(t2.elapsed()));

        self.logger.metric("faces", outcome.face_count() as f64);
        if let Some(verdict) = outcome.verdict() {
            self.logger.metric("liveness", verdict.score);
        }
        self.logger.frame(index, &overlay.summary());

        (outcome, detection_failed)
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
