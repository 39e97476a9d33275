//! Face localisation and landmark extraction
//!
//! [`LandmarkOracle`] is the seam the pipeline talks to. [`OnnxLandmarkOracle`]
//! implements it with two ONNX graphs run through tract:
//!
//! - a single-shot face detector with `scores [1, N, 2]` and
//!   `boxes [1, N, 4]` outputs (normalised corner coordinates), and
//! - a 68-point regressor taking a square face crop and returning 136
//!   values, `(x, y)` pairs normalised to the crop.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::landmarks::{FaceRegion, LandmarkSet, Point, NUM_LANDMARKS};
use crate::{DmsConfig, DmsError};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Face detector + landmark predictor.
///
/// Given a grayscale frame, returns face regions, then a 68-point landmark set
/// per region. Failures on one face must not affect the others, so the two
/// steps are separate calls.
pub trait LandmarkOracle: Send {
    /// Locate faces in the frame
    fn detect_faces(&self, gray: &GrayImage) -> Result<Vec<FaceRegion>, DmsError>;

    /// Extract landmarks for one detected face
    fn landmarks(&self, gray: &GrayImage, face: &FaceRegion) -> Result<LandmarkSet, DmsError>;
}

impl<T: LandmarkOracle + ?Sized> LandmarkOracle for Box<T> {
    fn detect_faces(&self, gray: &GrayImage) -> Result<Vec<FaceRegion>, DmsError> {
        (**self).detect_faces(gray)
    }

    fn landmarks(&self, gray: &GrayImage, face: &FaceRegion) -> Result<LandmarkSet, DmsError> {
        (**self).landmarks(gray, face)
    }
}

fn load_model(path: &Path, width: u32, height: u32) -> Result<RunnableModel, DmsError> {
    if !path.exists() {
        return Err(DmsError::ModelLoad(format!(
            "model file not found: {}",
            path.display()
        )));
    }

    tract_onnx::onnx()
        .model_for_path(path)
        .and_then(|model| {
            model.with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, height as usize, width as usize)),
            )
        })
        .and_then(|model| model.into_optimized())
        .and_then(|model| model.into_runnable())
        .map_err(|e| DmsError::ModelLoad(format!("{}: {:#}", path.display(), e)))
}

/// Single-shot face detector
pub struct FaceDetector {
    model: RunnableModel,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
    nms_iou: f32,
}

impl FaceDetector {
    pub fn load(path: &Path, config: &DmsConfig) -> Result<Self, DmsError> {
        let (input_width, input_height) = config.face_input_size;
        info!("Loading face detection model from {}", path.display());
        Ok(Self {
            model: load_model(path, input_width, input_height)?,
            input_width,
            input_height,
            confidence_threshold: config.face_confidence,
            nms_iou: config.nms_iou,
        })
    }

    /// Detect faces, in frame pixel coordinates
    pub fn detect(&self, gray: &GrayImage) -> Result<Vec<FaceRegion>, DmsError> {
        let resized = imageops::resize(gray, self.input_width, self.input_height, FilterType::Triangle);
        let input: Tensor = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.input_height as usize, self.input_width as usize),
            |(_, _, y, x)| (resized.get_pixel(x as u32, y as u32)[0] as f32 - 127.0) / 128.0,
        )
        .into();

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DmsError::Inference(e.to_string()))?;
        if outputs.len() < 2 {
            return Err(DmsError::Inference(format!(
                "face detector produced {} outputs, expected scores and boxes",
                outputs.len()
            )));
        }

        let scores = outputs[0]
            .as_slice::<f32>()
            .map_err(|e| DmsError::Inference(format!("scores output not f32: {}", e)))?;
        let boxes = outputs[1]
            .as_slice::<f32>()
            .map_err(|e| DmsError::Inference(format!("boxes output not f32: {}", e)))?;

        decode_detections(
            scores,
            boxes,
            gray.width(),
            gray.height(),
            self.confidence_threshold,
            self.nms_iou,
        )
    }
}

/// Turn raw `scores`/`boxes` into suppressed face regions scaled to the frame
pub(crate) fn decode_detections(
    scores: &[f32],
    boxes: &[f32],
    frame_width: u32,
    frame_height: u32,
    confidence_threshold: f32,
    nms_iou: f32,
) -> Result<Vec<FaceRegion>, DmsError> {
    if scores.len() % 2 != 0 || boxes.len() % 4 != 0 || scores.len() / 2 != boxes.len() / 4 {
        return Err(DmsError::Inference(format!(
            "mismatched detector outputs: {} scores, {} box values",
            scores.len(),
            boxes.len()
        )));
    }

    let (fw, fh) = (frame_width as f32, frame_height as f32);
    let candidates: Vec<FaceRegion> = scores
        .chunks_exact(2)
        .zip(boxes.chunks_exact(4))
        .filter(|(score, _)| score[1] >= confidence_threshold)
        .map(|(score, bbox)| {
            let x1 = bbox[0].clamp(0.0, 1.0) * fw;
            let y1 = bbox[1].clamp(0.0, 1.0) * fh;
            let x2 = bbox[2].clamp(0.0, 1.0) * fw;
            let y2 = bbox[3].clamp(0.0, 1.0) * fh;
            FaceRegion {
                x: x1,
                y: y1,
                width: (x2 - x1).max(0.0),
                height: (y2 - y1).max(0.0),
                confidence: score[1],
            }
        })
        .filter(|face| face.area() > 0.0)
        .collect();

    Ok(non_max_suppression(candidates, nms_iou))
}

fn non_max_suppression(mut candidates: Vec<FaceRegion>, iou_threshold: f32) -> Vec<FaceRegion> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<FaceRegion> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// 68-point landmark regressor over square face crops
pub struct LandmarkRegressor {
    model: RunnableModel,
    input_size: u32,
    crop_margin: f32,
}

impl LandmarkRegressor {
    pub fn load(path: &Path, config: &DmsConfig) -> Result<Self, DmsError> {
        info!("Loading landmark model from {}", path.display());
        Ok(Self {
            model: load_model(path, config.landmark_input_size, config.landmark_input_size)?,
            input_size: config.landmark_input_size,
            crop_margin: config.landmark_crop_margin,
        })
    }

    pub fn predict(&self, gray: &GrayImage, face: &FaceRegion) -> Result<LandmarkSet, DmsError> {
        let (x, y, side) = square_crop(face, self.crop_margin, gray.width(), gray.height())
            .ok_or(DmsError::EmptyCrop)?;

        let crop = imageops::crop_imm(gray, x, y, side, side).to_image();
        let crop = imageops::resize(&crop, self.input_size, self.input_size, FilterType::Triangle);
        let size = self.input_size as usize;
        let input: Tensor = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, _, py, px)| {
            crop.get_pixel(px as u32, py as u32)[0] as f32 / 255.0
        })
        .into();

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DmsError::Inference(e.to_string()))?;
        let values = outputs
            .first()
            .ok_or_else(|| DmsError::Inference("landmark model produced no outputs".into()))?
            .as_slice::<f32>()
            .map_err(|e| DmsError::Inference(format!("landmark output not f32: {}", e)))?;

        project_landmarks(values, x as f32, y as f32, side as f32)
    }
}

/// Square region centred on the face, grown by `margin`, clipped to the frame.
/// Returns `(x, y, side)`.
pub(crate) fn square_crop(
    face: &FaceRegion,
    margin: f32,
    frame_width: u32,
    frame_height: u32,
) -> Option<(u32, u32, u32)> {
    let side = face.width.max(face.height) * (1.0 + 2.0 * margin.max(0.0));
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;

    let x0 = (cx - side / 2.0).max(0.0);
    let y0 = (cy - side / 2.0).max(0.0);
    let x1 = (cx + side / 2.0).min(frame_width as f32);
    let y1 = (cy + side / 2.0).min(frame_height as f32);
    let side = (x1 - x0).min(y1 - y0).floor();

    if side < 1.0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, side as u32))
}

/// Map crop-normalised `(x, y)` pairs back to frame coordinates
pub(crate) fn project_landmarks(
    values: &[f32],
    origin_x: f32,
    origin_y: f32,
    side: f32,
) -> Result<LandmarkSet, DmsError> {
    if values.len() < NUM_LANDMARKS * 2 {
        return Err(DmsError::LandmarkCount(values.len() / 2));
    }

    let points = values[..NUM_LANDMARKS * 2]
        .chunks_exact(2)
        .map(|xy| Point::new(origin_x + xy[0] * side, origin_y + xy[1] * side))
        .collect();
    LandmarkSet::new(points)
}

/// ONNX-backed [`LandmarkOracle`]
pub struct OnnxLandmarkOracle {
    detector: FaceDetector,
    regressor: LandmarkRegressor,
}

impl OnnxLandmarkOracle {
    /// Load both models named in the configuration
    pub fn from_config(config: &DmsConfig) -> Result<Self, DmsError> {
        let face_path = config
            .face_model_path
            .as_deref()
            .ok_or_else(|| DmsError::Config("face_model_path is not set".into()))?;
        let landmark_path = config
            .landmark_model_path
            .as_deref()
            .ok_or_else(|| DmsError::Config("landmark_model_path is not set".into()))?;

        Ok(Self {
            detector: FaceDetector::load(Path::new(face_path), config)?,
            regressor: LandmarkRegressor::load(Path::new(landmark_path), config)?,
        })
    }
}

impl LandmarkOracle for OnnxLandmarkOracle {
    fn detect_faces(&self, gray: &GrayImage) -> Result<Vec<FaceRegion>, DmsError> {
        let faces = self.detector.detect(gray)?;
        debug!("Detected {} faces", faces.len());
        Ok(faces)
    }

    fn landmarks(&self, gray: &GrayImage, face: &FaceRegion) -> Result<LandmarkSet, DmsError> {
        self.regressor.predict(gray, face)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_filters_and_scales() {
        // two anchors: background, and a face covering the centre quarter
        let scores = [0.9, 0.1, 0.05, 0.95];
        let boxes = [0.0, 0.0, 1.0, 1.0, 0.25, 0.25, 0.75, 0.75];
        let faces = decode_detections(&scores, &boxes, 400, 200, 0.7, 0.3).unwrap();

        assert_eq!(faces.len(), 1);
        let face = faces[0];
        assert_eq!((face.x, face.y, face.width, face.height), (100.0, 50.0, 200.0, 100.0));
        assert_eq!(face.confidence, 0.95);
    }

    #[test]
    fn test_decode_suppresses_overlaps() {
        let scores = [0.0, 0.8, 0.0, 0.9, 0.0, 0.85];
        let boxes = [
            0.10, 0.10, 0.50, 0.50, // overlaps the next
            0.12, 0.12, 0.52, 0.52, // highest score
            0.60, 0.60, 0.90, 0.90, // separate face
        ];
        let faces = decode_detections(&scores, &boxes, 100, 100, 0.7, 0.3).unwrap();

        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].confidence, 0.9);
        assert_eq!(faces[1].confidence, 0.85);
    }

    #[test]
    fn test_decode_rejects_mismatched_outputs() {
        let err = decode_detections(&[0.1, 0.9], &[0.0; 8], 10, 10, 0.5, 0.3);
        assert!(matches!(err, Err(DmsError::Inference(_))));
    }

    #[test]
    fn test_square_crop_clipped_to_frame() {
        let face = FaceRegion { x: 0.0, y: 10.0, width: 40.0, height: 20.0, confidence: 1.0 };
        let (x, y, side) = square_crop(&face, 0.0, 100, 100).unwrap();
        // centred at (20, 20), side 40 would start at x=0, y=0
        assert_eq!((x, y, side), (0, 0, 40));

        let outside = FaceRegion { x: 200.0, y: 200.0, width: 10.0, height: 10.0, confidence: 1.0 };
        assert!(square_crop(&outside, 0.1, 100, 100).is_none());
    }

    #[test]
    fn test_project_landmarks() {
        let values: Vec<f32> = (0..136).map(|i| if i % 2 == 0 { 0.5 } else { 0.25 }).collect();
        let set = project_landmarks(&values, 10.0, 20.0, 100.0).unwrap();
        assert_eq!(set.points()[0], Point::new(60.0, 45.0));
        assert!(project_landmarks(&values[..100], 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_missing_model_path_is_config_error() {
        let err = OnnxLandmarkOracle::from_config(&DmsConfig::default());
        assert!(matches!(err, Err(DmsError::Config(_))));
    }

    #[test]
    fn test_missing_model_file_is_load_error() {
        let config = DmsConfig {
            face_model_path: Some("/nonexistent/face.onnx".into()),
            landmark_model_path: Some("/nonexistent/landmarks.onnx".into()),
            ..Default::default()
        };
        assert!(matches!(
            OnnxLandmarkOracle::from_config(&config),
            Err(DmsError::ModelLoad(_))
        ));
    }
}
