use std::collections::BTreeMap;
use std::time::Instant;

use crate::shared::constants::STATUS_LOG_INTERVAL;

/// Observer for capture-loop events.
///
/// The loop reports through this trait so the CLI can print a live status
/// line and a closing report while tests stay silent.
pub trait PipelineLogger: Send {
    /// One processed frame and its overlay text.
    fn frame(&mut self, index: usize, status: &str);

    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A point-in-time value, e.g. faces in the frame or the liveness score.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    fn warn(&mut self, message: &str) {
        log::warn!("{message}");
    }

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame(&mut self, _index: usize, _status: &str) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
}

/// Running count, sum and maximum of one series. Constant size however
/// many samples it has seen.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    count: usize,
    sum: f64,
    max: f64,
}

impl RunningStat {
    pub fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.sum += value;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Logs a status line every `throttle_frames` frames and aggregates
/// per-stage timings for the closing summary.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, RunningStat>,
    metrics: BTreeMap<String, RunningStat>,
    start_time: Instant,
    frames_seen: usize,
    warnings: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
            warnings: 0,
        }
    }

    /// Formatted report, or `None` before the first frame.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames_seen == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_seen;
        let mut lines = vec![format!(
            "Liveness summary ({frames} frames, {:.1}s, {} warnings):",
            elapsed_ms / 1000.0,
            self.warnings
        )];

        for (stage, stat) in &self.timings {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms",
                stat.mean(),
                stat.max(),
            ));
        }

        for (name, stat) in &self.metrics {
            lines.push(format!("  {name}: avg {:.3}", stat.mean()));
        }

        if elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<RunningStat> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<RunningStat> {
        self.metrics.get(name).copied()
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(STATUS_LOG_INTERVAL)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame(&mut self, index: usize, status: &str) {
        self.frames_seen += 1;
        if index % self.throttle_frames == 0 {
            log::info!("[frame {index}] {status}");
        } else {
            log::debug!("[frame {index}] {status}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&mut self, message: &str) {
        self.warnings += 1;
        log::warn!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.frame(0, "Faces: 0");
        logger.timing("detect", 5.0);
        logger.metric("faces", 1.0);
        logger.info("hello");
        logger.warn("careful");
        logger.summary();
    }

    #[test]
    fn test_timing_records_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("score", 5.0);

        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count(), 2);
        assert_relative_eq!(detect.mean(), 25.0);
        assert_relative_eq!(detect.max(), 30.0);
        assert_eq!(logger.timings_for("score").unwrap().count(), 1);
        assert!(logger.timings_for("annotate").is_none());
    }

    #[test]
    fn test_metric_average_in_summary() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.frame(0, "Faces: 1");
        logger.metric("liveness", 0.5);
        logger.metric("liveness", 0.75);

        assert_relative_eq!(logger.metrics_for("liveness").unwrap().mean(), 0.625);
        assert!(logger.summary_string().unwrap().contains("liveness: avg 0.625"));
    }

    #[test]
    fn test_summary_lists_stages_and_warnings() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.frame(0, "Faces: 1");
        logger.timing("detect", 10.0);
        logger.timing("score", 4.0);
        logger.warn("frame 0 degraded");

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Liveness summary (1 frames"));
        assert!(summary.contains("1 warnings"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("score"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_running_stat_max_of_negative_series() {
        let mut stat = RunningStat::default();
        stat.record(-3.0);
        stat.record(-1.0);
        assert_relative_eq!(stat.max(), -1.0);
        assert_relative_eq!(stat.mean(), -2.0);
        assert_relative_eq!(RunningStat::default().mean(), 0.0);
    }

    #[test]
    fn test_long_session_keeps_fixed_size_state() {
        let mut logger = StdoutPipelineLogger::new(1_000);
        for i in 0..200_000 {
            logger.frame(i, "Faces: 1  Liveness: 0.812");
            logger.timing("detect", 2.0);
            logger.timing("score", 1.0);
            logger.timing("annotate", 0.5);
            logger.metric("faces", 1.0);
            logger.metric("liveness", if i % 2 == 0 { 0.8 } else { 0.6 });
        }

        assert_eq!(logger.timings.len(), 3);
        assert_eq!(logger.metrics.len(), 2);
        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count(), 200_000);
        assert_relative_eq!(detect.mean(), 2.0);
        assert_relative_eq!(
            logger.metrics_for("liveness").unwrap().mean(),
            0.7,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = StdoutPipelineLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_frame_counts_every_call() {
        let mut logger = StdoutPipelineLogger::new(7);
        for i in 0..20 {
            logger.frame(i, "Faces: 0");
        }
        assert_eq!(logger.frames_seen(), 20);
    }

    #[test]
    fn test_zero_throttle_clamped() {
        let logger = StdoutPipelineLogger::new(0);
        assert_eq!(logger.throttle_frames, 1);
        assert_eq!(StdoutPipelineLogger::default().throttle_frames, 30);
    }
}
