use std::time::Duration;

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::video::domain::frame_source::{CaptureError, FrameSource, SourceInfo, SourceSpec};

/// Exponential backoff for opening a frame source.
///
/// Attempt `n` (zero-based) is followed by a pause of `initial_backoff * 2^n`
/// before the next attempt. No pause follows the final attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    /// `attempts` is clamped to at least one.
    pub fn new(attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            initial_backoff,
        }
    }

    /// Single attempt, no waiting.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Pause after failed attempt `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(200))
    }
}

/// Opens `source`, retrying with backoff. `sleep` performs each pause.
///
/// Exhausting the policy yields [`CaptureError::DeviceUnavailable`] carrying
/// the last failure.
pub fn open_with_retry(
    source: &mut dyn FrameSource,
    spec: &SourceSpec,
    policy: &RetryPolicy,
    logger: &mut dyn PipelineLogger,
    mut sleep: impl FnMut(Duration),
) -> Result<SourceInfo, CaptureError> {
    let mut last_error = String::new();
    for attempt in 0..policy.attempts() {
        match source.open(spec) {
            Ok(info) => return Ok(info),
            Err(e) => {
                last_error = e.to_string();
                if attempt + 1 < policy.attempts() {
                    let wait = policy.backoff(attempt);
                    logger.warn(&format!(
                        "Cannot open {spec} (attempt {}/{}): {last_error}; retrying in {}ms",
                        attempt + 1,
                        policy.attempts(),
                        wait.as_millis()
                    ));
                    sleep(wait);
                }
            }
        }
    }
    Err(CaptureError::DeviceUnavailable {
        source_desc: spec.to_string(),
        attempts: policy.attempts(),
        last_error,
    })
}
