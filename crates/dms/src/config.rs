//! DMS configuration

use serde::{Deserialize, Serialize};

/// What happens to the debounce state when detection is switched off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisablePolicy {
    /// Clear the low-EAR counter and drop back to calm
    #[default]
    Reset,
    /// Keep counter and level; counting resumes where it stopped
    Preserve,
}

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Averaged EAR below this counts as "eyes closed"
    pub ear_threshold: f32,

    /// Consecutive closed-eye frames before alerting
    pub frame_check: u32,

    /// Debounce behaviour on disable
    pub disable_policy: DisablePolicy,

    /// Face detection confidence threshold
    pub face_confidence: f32,

    /// IoU above which overlapping face boxes are suppressed
    pub nms_iou: f32,

    /// Face detector input size (width, height)
    pub face_input_size: (u32, u32),

    /// Square input edge of the landmark regressor
    pub landmark_input_size: u32,

    /// Margin added around a face box before landmark regression (fraction of box size)
    pub landmark_crop_margin: f32,

    /// Model paths
    pub face_model_path: Option<String>,
    pub landmark_model_path: Option<String>,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            frame_check: 20,
            disable_policy: DisablePolicy::Reset,
            face_confidence: 0.7,
            nms_iou: 0.3,
            face_input_size: (320, 240),
            landmark_input_size: 112,
            landmark_crop_margin: 0.1,
            face_model_path: None,
            landmark_model_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_thresholds() {
        let config = DmsConfig::default();
        assert_eq!(config.ear_threshold, 0.25);
        assert_eq!(config.frame_check, 20);
        assert_eq!(config.disable_policy, DisablePolicy::Reset);
    }
}
