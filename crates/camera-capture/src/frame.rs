//! Video frame types and processing

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, GrayImage, ImageFormat, RgbImage};

use crate::CameraError;

/// Pixel format delivered by a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Mjpeg,
    Yuyv,
}

impl PixelFormat {
    /// Map a V4L2 fourcc to a supported format
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"MJPG" => Some(PixelFormat::Mjpeg),
            b"YUYV" => Some(PixelFormat::Yuyv),
            _ => None,
        }
    }
}

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since source start)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Decode a raw device buffer into an RGB frame
    pub fn from_raw(
        format: PixelFormat,
        raw: &[u8],
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, CameraError> {
        let (data, width, height) = match format {
            PixelFormat::Rgb24 => {
                let expected = (width as usize) * (height as usize) * 3;
                if raw.len() < expected {
                    return Err(CameraError::Decode(format!(
                        "short RGB24 buffer: expected {} bytes, got {}",
                        expected,
                        raw.len()
                    )));
                }
                (raw[..expected].to_vec(), width, height)
            }
            PixelFormat::Mjpeg => {
                let img = image::load_from_memory_with_format(raw, ImageFormat::Jpeg)
                    .map_err(|e| CameraError::Decode(e.to_string()))?
                    .to_rgb8();
                let (w, h) = img.dimensions();
                (img.into_raw(), w, h)
            }
            PixelFormat::Yuyv => (yuyv_to_rgb(raw, width, height)?, width, height),
        };

        Ok(Self::new(data, width, height, timestamp_ns, sequence))
    }

    /// View as an owned `RgbImage`
    pub fn into_rgb_image(self) -> Result<RgbImage, CameraError> {
        let (width, height) = (self.width, self.height);
        RgbImage::from_raw(width, height, self.data).ok_or_else(|| {
            CameraError::Format(format!("buffer does not hold {}x{} RGB pixels", width, height))
        })
    }
}

/// Resize to `target_width`, preserving aspect ratio.
///
/// Frames already at the target width are returned untouched.
pub fn resize_to_width(img: &RgbImage, target_width: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    if width == target_width || width == 0 || target_width == 0 {
        return img.clone();
    }
    let target_height = ((height as f64 * target_width as f64) / width as f64)
        .round()
        .max(1.0) as u32;
    imageops::resize(img, target_width, target_height, FilterType::Triangle)
}

/// Grayscale derivative used for face detection
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    imageops::grayscale(img)
}

/// Encode an RGB image as JPEG
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, CameraError> {
    let mut out = Vec::with_capacity((img.width() * img.height() / 4) as usize);
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .map_err(|e| CameraError::Encode(e.to_string()))?;
    Ok(out)
}

/// Convert packed YUYV 4:2:2 to RGB24
fn yuyv_to_rgb(raw: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CameraError> {
    let pixels = (width as usize) * (height as usize);
    if raw.len() < pixels * 2 {
        return Err(CameraError::Decode(format!(
            "short YUYV buffer: expected {} bytes, got {}",
            pixels * 2,
            raw.len()
        )));
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in raw[..pixels * 2].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0] as f32, chunk[1] as f32 - 128.0, chunk[2] as f32, chunk[3] as f32 - 128.0);
        for y in [y0, y1] {
            let r = y + 1.402 * v;
            let g = y - 0.344 * u - 0.714 * v;
            let b = y + 1.772 * u;
            rgb.push(r.clamp(0.0, 255.0) as u8);
            rgb.push(g.clamp(0.0, 255.0) as u8);
            rgb.push(b.clamp(0.0, 255.0) as u8);
        }
    }
    Ok(rgb)
}
