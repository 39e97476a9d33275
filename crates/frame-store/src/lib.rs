//! Latest-Frame Store
//!
//! Holds the single most recent encoded frame for any number of readers.

mod store;

pub use store::FrameStore;

use serde::{Deserialize, Serialize};

/// Detection outcome attached to a published frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub faces_detected: usize,
    pub faces_scored: usize,
    pub tracked_ear: Option<f32>,
    pub low_ear_frames: u32,
    pub alerting: bool,
}

/// One encoded frame as handed to stream readers
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedFrame {
    /// JPEG bytes
    pub jpeg: Vec<u8>,
    /// Publish sequence, starting at 1
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// `None` while detection is disabled or failed for this frame
    pub detection: Option<DetectionSummary>,
}
