//! Eye aspect ratio

use crate::landmarks::Point;
use crate::DmsError;

/// Points per eye in the 68-point scheme
pub const EYE_POINTS: usize = 6;

/// `(|p2-p6| + |p3-p5|) / (2 * |p1-p4|)` over one eye's six landmarks.
///
/// Falls toward zero as the lids close.
pub fn eye_aspect_ratio(eye: &[Point]) -> Result<f32, DmsError> {
    if eye.len() != EYE_POINTS {
        return Err(DmsError::InvalidEye(eye.len()));
    }

    let vertical_a = eye[1].distance(&eye[5]);
    let vertical_b = eye[2].distance(&eye[4]);
    let horizontal = eye[0].distance(&eye[3]);

    if horizontal <= f32::EPSILON {
        return Err(DmsError::DegenerateEye);
    }

    Ok((vertical_a + vertical_b) / (2.0 * horizontal))
}

/// Per-face EAR: mean of both eyes
pub fn average_ear(left: &[Point], right: &[Point]) -> Result<f32, DmsError> {
    Ok((eye_aspect_ratio(left)? + eye_aspect_ratio(right)?) / 2.0)
}

#[cfg(test)]
pub(crate) fn synthetic_eye(cx: f32, cy: f32, half_width: f32, half_height: f32) -> Vec<Point> {
    // p1 outer corner, p2/p3 upper lid, p4 inner corner, p5/p6 lower lid
    vec![
        Point::new(cx - half_width, cy),
        Point::new(cx - half_width / 3.0, cy - half_height),
        Point::new(cx + half_width / 3.0, cy - half_height),
        Point::new(cx + half_width, cy),
        Point::new(cx + half_width / 3.0, cy + half_height),
        Point::new(cx - half_width / 3.0, cy + half_height),
    ]
}
