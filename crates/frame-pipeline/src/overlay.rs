//! Overlay drawing on published frames

use dms::{DmsAnalysis, Point};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::geometry::convex_hull;
use imageproc::rect::Rect;

pub const EYE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const ALERT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const BANNER_HEIGHT: u32 = 36;
const BORDER_WIDTH: u32 = 3;

/// Outline one eye with its convex hull
pub fn draw_eye_contour(img: &mut RgbImage, eye: &[Point]) {
    let points: Vec<imageproc::point::Point<i32>> = eye
        .iter()
        .map(|p| imageproc::point::Point::new(p.x.round() as i32, p.y.round() as i32))
        .collect();
    let hull = convex_hull(points.as_slice());
    if hull.len() < 2 {
        return;
    }

    for (i, start) in hull.iter().enumerate() {
        let end = hull[(i + 1) % hull.len()];
        draw_line_segment_mut(
            img,
            (start.x as f32, start.y as f32),
            (end.x as f32, end.y as f32),
            EYE_COLOR,
        );
    }
}

/// Red banner across the top plus a red frame border
pub fn draw_alert_banner(img: &mut RgbImage) {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    draw_filled_rect_mut(
        img,
        Rect::at(0, 0).of_size(width, BANNER_HEIGHT.min(height)),
        ALERT_COLOR,
    );
    for inset in 0..BORDER_WIDTH.min(width / 2).min(height / 2) {
        draw_hollow_rect_mut(
            img,
            Rect::at(inset as i32, inset as i32).of_size(width - 2 * inset, height - 2 * inset),
            ALERT_COLOR,
        );
    }
}

/// Eye contours for every scored face, banner while alerting
pub fn annotate(img: &mut RgbImage, analysis: &DmsAnalysis) {
    for reading in &analysis.readings {
        draw_eye_contour(img, &reading.left_eye);
        draw_eye_contour(img, &reading.right_eye);
    }
    if analysis.is_alerting() {
        draw_alert_banner(img);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms::{DrowsinessLevel, FaceReading, FaceRegion, Transition};

    fn eye() -> Vec<Point> {
        vec![
            Point::new(10.0, 20.0),
            Point::new(15.0, 17.0),
            Point::new(25.0, 17.0),
            Point::new(30.0, 20.0),
            Point::new(25.0, 23.0),
            Point::new(15.0, 23.0),
        ]
    }

    fn analysis(level: DrowsinessLevel) -> DmsAnalysis {
        DmsAnalysis {
            faces_detected: 1,
            readings: vec![FaceReading {
                region: FaceRegion { x: 0.0, y: 0.0, width: 50.0, height: 50.0, confidence: 1.0 },
                left_eye: eye(),
                right_eye: vec![],
                ear: 0.3,
            }],
            tracked: Some(0),
            low_ear_frames: 0,
            level,
            transition: Transition::Steady,
        }
    }

    #[test]
    fn test_eye_contour_drawn_on_corners() {
        let mut img = RgbImage::new(60, 60);
        draw_eye_contour(&mut img, &eye());
        assert_eq!(*img.get_pixel(10, 20), EYE_COLOR);
        assert_eq!(*img.get_pixel(30, 20), EYE_COLOR);
        // interior untouched
        assert_eq!(*img.get_pixel(20, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_degenerate_eye_is_ignored() {
        let mut img = RgbImage::new(10, 10);
        draw_eye_contour(&mut img, &[]);
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_banner_only_while_alerting() {
        let mut calm = RgbImage::new(100, 80);
        annotate(&mut calm, &analysis(DrowsinessLevel::Calm));
        assert_eq!(*calm.get_pixel(50, 10), Rgb([0, 0, 0]));

        let mut alerting = RgbImage::new(100, 80);
        annotate(&mut alerting, &analysis(DrowsinessLevel::Alerting));
        assert_eq!(*alerting.get_pixel(50, 10), ALERT_COLOR);
        assert_eq!(*alerting.get_pixel(0, 79), ALERT_COLOR);
        assert_eq!(*alerting.get_pixel(50, 60), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_banner_on_tiny_frame() {
        let mut img = RgbImage::new(1, 1);
        draw_alert_banner(&mut img);
        assert_eq!(*img.get_pixel(0, 0), ALERT_COLOR);
    }
}
