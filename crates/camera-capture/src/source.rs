//! Frame sources and device probing

use std::time::Instant;

use tracing::{info, warn};

use crate::frame::VideoFrame;
use crate::{CameraConfig, CameraError};

/// Anything that can hand back frames on demand.
///
/// `read_frame` blocks for at most one frame interval of the underlying device.
/// Retry policy belongs to the caller.
pub trait FrameSource: Send {
    /// Capture the next frame
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// Human-readable device name
    fn device(&self) -> &str;
}

impl FrameSource for Box<dyn FrameSource> {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        (**self).read_frame()
    }

    fn device(&self) -> &str {
        (**self).device()
    }
}

/// Open a source for the configured device.
///
/// `stub://` paths always yield a [`SyntheticSource`]; anything else needs the
/// `v4l2` feature on Linux.
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    if config.is_synthetic() {
        return Ok(Box::new(SyntheticSource::new(config.clone())));
    }
    open_device(config)
}

#[cfg(all(feature = "v4l2", target_os = "linux"))]
fn open_device(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    Ok(Box::new(crate::v4l2::V4l2Source::open(config.clone())?))
}

#[cfg(not(all(feature = "v4l2", target_os = "linux")))]
fn open_device(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    Err(CameraError::Unsupported(config.device.clone()))
}

/// Outcome of probing one device
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub device: String,
    pub opened: bool,
    /// Dimensions of the test frame, if one was captured
    pub frame_size: Option<(u32, u32)>,
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn usable(&self) -> bool {
        self.opened && self.frame_size.is_some()
    }
}

/// Try each device in order and return the first one that opens and captures
/// a frame, together with a report for every device attempted.
pub fn probe(
    base: &CameraConfig,
    devices: &[String],
) -> (Option<Box<dyn FrameSource>>, Vec<ProbeReport>) {
    let mut reports = Vec::with_capacity(devices.len());

    for device in devices {
        let config = base.for_device(device);
        let mut report = ProbeReport {
            device: device.clone(),
            opened: false,
            frame_size: None,
            error: None,
        };

        let mut source = match open_source(&config) {
            Ok(source) => source,
            Err(e) => {
                warn!("Camera {} failed to open: {}", device, e);
                report.error = Some(e.to_string());
                reports.push(report);
                continue;
            }
        };
        report.opened = true;

        match source.read_frame() {
            Ok(frame) => {
                info!("Camera {} captures {}x{} frames", device, frame.width, frame.height);
                report.frame_size = Some((frame.width, frame.height));
                reports.push(report);
                return (Some(source), reports);
            }
            Err(e) => {
                warn!("Camera {} opened but cannot capture frames: {}", device, e);
                report.error = Some(e.to_string());
                reports.push(report);
            }
        }
    }

    (None, reports)
}

/// One line per device that could not be used, or `None` if all were fine
pub fn failure_summary(reports: &[ProbeReport]) -> Option<String> {
    let failures: Vec<String> = reports
        .iter()
        .filter(|report| !report.usable())
        .map(|report| {
            let reason = report.error.as_deref().unwrap_or("no frame captured");
            format!("{} ({})", report.device, reason)
        })
        .collect();

    if failures.is_empty() {
        None
    } else {
        Some(failures.join("; "))
    }
}

/// Deterministic gradient frames for `stub://` devices
pub struct SyntheticSource {
    config: CameraConfig,
    started: Instant,
    sequence: u32,
}

impl SyntheticSource {
    pub fn new(config: CameraConfig) -> Self {
        info!("SyntheticSource: connected to {}", config.device);
        Self {
            config,
            started: Instant::now(),
            sequence: 0,
        }
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let (width, height) = (self.config.width.max(1), self.config.height.max(1));
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let shade = ((x + y + self.sequence) % 256) as u8;
                pixels.extend_from_slice(&[shade, shade / 2, 255 - shade]);
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        self.sequence = self.sequence.wrapping_add(1);
        let pixels = self.generate_pixels();
        Ok(VideoFrame::new(
            pixels,
            self.config.width.max(1),
            self.config.height.max(1),
            self.started.elapsed().as_nanos() as u64,
            self.sequence,
        ))
    }

    fn device(&self) -> &str {
        &self.config.device
    }
}
