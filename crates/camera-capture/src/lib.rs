//! Camera Capture Library for the Drowsiness Monitor
//!
//! Hands raw RGB frames to the frame pipeline on demand.
//! Supports:
//! - V4L2 webcams (MJPEG, YUYV or RGB24), behind the `v4l2` feature
//! - Synthetic `stub://` sources for tests and demos
//! - Probing an ordered list of devices for the first usable one

pub mod frame;
pub mod source;
#[cfg(all(feature = "v4l2", target_os = "linux"))]
pub mod v4l2;

pub use frame::{PixelFormat, VideoFrame};
pub use source::{failure_summary, open_source, probe, FrameSource, ProbeReport, SyntheticSource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Frame encode failed: {0}")]
    Encode(String),

    #[error("No usable camera among: {0}")]
    NoDevice(String),

    #[error("Camera support not compiled in for {0} (enable the `v4l2` feature)")]
    Unsupported(String),
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or `stub://<name>`
    pub device: String,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Requested FPS (0 leaves the driver default)
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl CameraConfig {
    /// Same settings, different device path
    pub fn for_device(&self, device: &str) -> Self {
        Self {
            device: device.to_string(),
            ..self.clone()
        }
    }

    /// Whether this config points at a synthetic source
    pub fn is_synthetic(&self) -> bool {
        self.device.starts_with("stub://")
    }
}
