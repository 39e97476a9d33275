//! Frame Pipeline
//!
//! One dedicated worker thread per camera:
//! acquire -> resize -> (detect -> score -> debounce) -> overlay -> encode -> publish.
//!
//! The detection switch is shared with the control surface through
//! [`DetectionControl`]; frames go out through a [`frame_store::FrameStore`].
//! Debounce state never leaves the worker.

pub mod control;
pub mod overlay;
mod pipeline;

pub use control::DetectionControl;
pub use pipeline::{FramePipeline, StepOutcome};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames are resized to this width before detection
    pub target_width: u32,
    /// JPEG quality of published frames (1-100)
    pub jpeg_quality: u8,
    /// Consecutive capture failures retried without sleeping
    pub immediate_retries: u32,
    /// First backoff after the immediate retries are used up (ms)
    pub failure_backoff_ms: u64,
    /// Backoff ceiling (ms)
    pub max_failure_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_width: 450,
            jpeg_quality: 80,
            immediate_retries: 2,
            failure_backoff_ms: 10,
            max_failure_backoff_ms: 500,
        }
    }
}

impl PipelineConfig {
    /// Sleep before the next capture attempt after `failures` consecutive failures
    pub fn backoff(&self, failures: u32) -> Option<Duration> {
        if failures <= self.immediate_retries {
            return None;
        }
        let exponent = (failures - self.immediate_retries - 1).min(16);
        let delay = self
            .failure_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_failure_backoff_ms);
        Some(Duration::from_millis(delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let config = PipelineConfig::default();
        assert_eq!(config.backoff(0), None);
        assert_eq!(config.backoff(1), None);
        assert_eq!(config.backoff(2), None);
        assert_eq!(config.backoff(3), Some(Duration::from_millis(10)));
        assert_eq!(config.backoff(4), Some(Duration::from_millis(20)));
        assert_eq!(config.backoff(7), Some(Duration::from_millis(160)));
        assert_eq!(config.backoff(9), Some(Duration::from_millis(500)));
        assert_eq!(config.backoff(u32::MAX), Some(Duration::from_millis(500)));
    }
}
