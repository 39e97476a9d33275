//! Driver Monitoring System (DMS)
//!
//! Per-frame driver state analysis from facial landmarks:
//! - Face localisation and 68-point landmarks (behind [`LandmarkOracle`])
//! - Eye aspect ratio scoring
//! - Consecutive-frame debouncing of eye closure into a drowsiness alert

pub mod analysis;
pub mod config;
pub mod detector;
pub mod ear;
pub mod landmarks;
pub mod state;

pub use analysis::{DmsAnalysis, FaceReading};
pub use config::{DisablePolicy, DmsConfig};
pub use detector::{FaceDetector, LandmarkOracle, LandmarkRegressor, OnnxLandmarkOracle};
pub use ear::{average_ear, eye_aspect_ratio};
pub use landmarks::{FaceRegion, LandmarkSet, Point};
pub use state::{DriverState, DrowsinessLevel, DrowsinessMonitor, Transition};

use image::GrayImage;
use thiserror::Error;
use tracing::warn;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Expected 68 landmarks, got {0}")]
    LandmarkCount(usize),

    #[error("Eye needs exactly 6 landmarks, got {0}")]
    InvalidEye(usize),

    #[error("Eye corners coincide, aspect ratio undefined")]
    DegenerateEye,

    #[error("Face region lies outside the frame")]
    EmptyCrop,
}

/// Driver monitoring module.
///
/// Owns the oracle and the debounce state; meant to live on the pipeline worker.
pub struct DmsModule<O> {
    oracle: O,
    monitor: DrowsinessMonitor,
}

impl<O: LandmarkOracle> DmsModule<O> {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig, oracle: O) -> Self {
        let monitor =
            DrowsinessMonitor::new(config.ear_threshold, config.frame_check, config.disable_policy);
        Self { oracle, monitor }
    }

    /// Analyze a single grayscale frame and advance the debounce state.
    ///
    /// Landmark or scoring failures drop only the affected face. A failed face
    /// detection returns an error and leaves the debounce state untouched, as
    /// does a frame where faces were found but none could be scored.
    pub fn analyze(&mut self, gray: &GrayImage) -> Result<DmsAnalysis, DmsError> {
        let faces = self.oracle.detect_faces(gray)?;

        let readings: Vec<FaceReading> = faces
            .iter()
            .filter_map(|face| match self.score_face(gray, face) {
                Ok(reading) => Some(reading),
                Err(e) => {
                    warn!("Skipping face at ({:.0}, {:.0}): {}", face.x, face.y, e);
                    None
                }
            })
            .collect();

        let tracked = largest_face(&readings);
        let transition = if !faces.is_empty() && readings.is_empty() {
            Transition::Steady
        } else {
            self.monitor.update(tracked.map(|i| readings[i].ear))
        };

        Ok(DmsAnalysis {
            faces_detected: faces.len(),
            readings,
            tracked,
            low_ear_frames: self.monitor.state().low_ear_frames,
            level: self.monitor.level(),
            transition,
        })
    }

    fn score_face(&self, gray: &GrayImage, face: &FaceRegion) -> Result<FaceReading, DmsError> {
        let landmarks = self.oracle.landmarks(gray, face)?;
        let ear = average_ear(landmarks.left_eye(), landmarks.right_eye())?;
        Ok(FaceReading {
            region: *face,
            left_eye: landmarks.left_eye().to_vec(),
            right_eye: landmarks.right_eye().to_vec(),
            ear,
        })
    }

    /// Detection was switched off
    pub fn pause(&mut self) {
        self.monitor.pause();
    }

    pub fn monitor(&self) -> &DrowsinessMonitor {
        &self.monitor
    }
}

/// Index of the reading with the largest face box (first wins ties)
fn largest_face(readings: &[FaceReading]) -> Option<usize> {
    readings
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, r)| match best {
            Some((_, area)) if area >= r.region.area() => best,
            _ => Some((i, r.region.area())),
        })
        .map(|(i, _)| i)
}
