//! Face regions and the 68-point landmark scheme
//!
//! Index layout:
//! - 0-16: jaw
//! - 17-26: brows
//! - 27-35: nose
//! - 36-41: left eye
//! - 42-47: right eye
//! - 48-67: mouth

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::DmsError;

/// Number of points in a full landmark set
pub const NUM_LANDMARKS: usize = 68;

/// Left eye indices
pub const LEFT_EYE: Range<usize> = 36..42;

/// Right eye indices
pub const RIGHT_EYE: Range<usize> = 42..48;

/// 2D point in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Face bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl FaceRegion {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection over union
    pub fn iou(&self, other: &FaceRegion) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Ordered 68-point landmark set for one face
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    /// Wrap exactly [`NUM_LANDMARKS`] points
    pub fn new(points: Vec<Point>) -> Result<Self, DmsError> {
        if points.len() != NUM_LANDMARKS {
            return Err(DmsError::LandmarkCount(points.len()));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn left_eye(&self) -> &[Point] {
        &self.points[LEFT_EYE]
    }

    pub fn right_eye(&self) -> &[Point] {
        &self.points[RIGHT_EYE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_set_requires_68_points() {
        assert!(matches!(
            LandmarkSet::new(vec![Point::default(); 67]),
            Err(DmsError::LandmarkCount(67))
        ));
        assert!(LandmarkSet::new(vec![Point::default(); 68]).is_ok());
    }

    #[test]
    fn test_eye_slices() {
        let points: Vec<Point> = (0..68).map(|i| Point::new(i as f32, 0.0)).collect();
        let set = LandmarkSet::new(points).unwrap();
        assert_eq!(set.left_eye().len(), 6);
        assert_eq!(set.left_eye()[0].x, 36.0);
        assert_eq!(set.right_eye()[5].x, 47.0);
    }

    #[test]
    fn test_iou() {
        let a = FaceRegion { x: 0.0, y: 0.0, width: 10.0, height: 10.0, confidence: 1.0 };
        let b = FaceRegion { x: 5.0, y: 0.0, width: 10.0, height: 10.0, confidence: 1.0 };
        let far = FaceRegion { x: 50.0, y: 50.0, width: 10.0, height: 10.0, confidence: 1.0 };
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&far), 0.0);
        assert_eq!(a.iou(&a), 1.0);
    }
}
