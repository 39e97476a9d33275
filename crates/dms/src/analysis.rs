//! DMS analysis results

use serde::{Deserialize, Serialize};

use crate::landmarks::{FaceRegion, Point};
use crate::state::{DrowsinessLevel, Transition};

/// One face that made it through landmark extraction and scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceReading {
    pub region: FaceRegion,
    pub left_eye: Vec<Point>,
    pub right_eye: Vec<Point>,
    /// Mean EAR of both eyes
    pub ear: f32,
}

/// Complete per-frame DMS result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmsAnalysis {
    /// Number of faces the detector returned
    pub faces_detected: usize,

    /// Faces that were scored successfully
    pub readings: Vec<FaceReading>,

    /// Index into `readings` of the face feeding the debounce state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked: Option<usize>,

    /// Consecutive low-EAR frames after this update
    pub low_ear_frames: u32,

    /// Current drowsiness level
    pub level: DrowsinessLevel,

    /// Level change caused by this frame
    pub transition: Transition,
}

impl DmsAnalysis {
    /// EAR of the tracked face
    pub fn tracked_ear(&self) -> Option<f32> {
        self.tracked.and_then(|i| self.readings.get(i)).map(|r| r.ear)
    }

    pub fn is_alerting(&self) -> bool {
        self.level == DrowsinessLevel::Alerting
    }

    /// Whether this frame just crossed into alerting
    pub fn alert_entered(&self) -> bool {
        self.transition == Transition::Entered
    }
}
