//! V4L2 webcam source.
//!
//! Requests MJPEG from the device and falls back to whatever the driver
//! settles on, as long as it is MJPEG, YUYV or RGB24.

use std::time::Instant;

use tracing::{info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::frame::{PixelFormat, VideoFrame};
use crate::source::FrameSource;
use crate::{CameraConfig, CameraError};

const BUFFER_COUNT: u32 = 4;

/// Memory-mapped V4L2 capture stream
pub struct V4l2Source {
    config: CameraConfig,
    // Declared before `device` so the mapping is released first.
    stream: MmapStream<'static>,
    #[allow(dead_code)]
    device: Device,
    format: PixelFormat,
    width: u32,
    height: u32,
    started: Instant,
}

impl V4l2Source {
    /// Open the device, negotiate a format and start streaming
    pub fn open(config: CameraConfig) -> Result<Self, CameraError> {
        let device = Device::with_path(&config.device)
            .map_err(|e| CameraError::Open(format!("{}: {}", config.device, e)))?;

        let mut format = device
            .format()
            .map_err(|e| CameraError::Format(e.to_string()))?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = FourCC::new(b"MJPG");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                warn!("V4l2Source: failed to set format on {}: {}", config.device, err);
                device
                    .format()
                    .map_err(|e| CameraError::Format(e.to_string()))?
            }
        };

        let pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            CameraError::Format(format!("unsupported fourcc {}", format.fourcc))
        })?;

        if config.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.fps);
            if let Err(err) = device.set_params(&params) {
                warn!("V4l2Source: failed to set fps on {}: {}", config.device, err);
            }
        }

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| CameraError::Stream(format!("create buffer stream: {}", e)))?;

        info!(
            "V4l2Source: connected to {} ({}x{} {:?})",
            config.device, format.width, format.height, pixel_format
        );

        Ok(Self {
            config,
            stream,
            device,
            format: pixel_format,
            width: format.width,
            height: format.height,
            started: Instant::now(),
        })
    }
}

impl FrameSource for V4l2Source {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::Stream(e.to_string()))?;

        let used = (meta.bytesused as usize).min(buf.len());
        let raw = if used == 0 { buf } else { &buf[..used] };

        VideoFrame::from_raw(
            self.format,
            raw,
            self.width,
            self.height,
            self.started.elapsed().as_nanos() as u64,
            meta.sequence,
        )
    }

    fn device(&self) -> &str {
        &self.config.device
    }
}
