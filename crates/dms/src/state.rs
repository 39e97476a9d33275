//! Driver state tracking: consecutive-frame debounce of eye closure

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DisablePolicy;

/// Drowsiness level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrowsinessLevel {
    /// Eyes open, or closed for fewer than `frame_check` frames
    #[default]
    Calm,
    /// Eyes closed for at least `frame_check` consecutive frames
    Alerting,
}

/// Level change produced by one update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Steady,
    /// Calm -> Alerting
    Entered,
    /// Alerting -> Calm
    Cleared,
}

/// Driver state (tracked over frames)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverState {
    /// Consecutive frames with EAR below threshold
    pub low_ear_frames: u32,

    /// Current drowsiness level
    pub level: DrowsinessLevel,
}

impl DriverState {
    /// Reset state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Debounce state machine over per-frame EAR readings.
///
/// Owned by exactly one pipeline worker; not shared.
#[derive(Debug, Clone)]
pub struct DrowsinessMonitor {
    ear_threshold: f32,
    frame_check: u32,
    disable_policy: DisablePolicy,
    state: DriverState,
}

impl DrowsinessMonitor {
    pub fn new(ear_threshold: f32, frame_check: u32, disable_policy: DisablePolicy) -> Self {
        Self {
            ear_threshold,
            frame_check: frame_check.max(1),
            disable_policy,
            state: DriverState::default(),
        }
    }

    /// Feed one frame. `ear` is `None` when no face was found.
    pub fn update(&mut self, ear: Option<f32>) -> Transition {
        let previous = self.state.level;

        match ear {
            Some(ear) if ear < self.ear_threshold => {
                self.state.low_ear_frames = self.state.low_ear_frames.saturating_add(1);
            }
            _ => self.state.low_ear_frames = 0,
        }

        self.state.level = if self.state.low_ear_frames >= self.frame_check {
            DrowsinessLevel::Alerting
        } else {
            DrowsinessLevel::Calm
        };

        match (previous, self.state.level) {
            (DrowsinessLevel::Calm, DrowsinessLevel::Alerting) => {
                info!(
                    "Drowsiness alert: eyes closed for {} frames",
                    self.state.low_ear_frames
                );
                Transition::Entered
            }
            (DrowsinessLevel::Alerting, DrowsinessLevel::Calm) => {
                info!("Drowsiness alert cleared");
                Transition::Cleared
            }
            _ => Transition::Steady,
        }
    }

    /// Detection was switched off; apply the configured policy
    pub fn pause(&mut self) {
        match self.disable_policy {
            DisablePolicy::Reset => {
                debug!("Detection paused, resetting debounce state");
                self.state.reset();
            }
            DisablePolicy::Preserve => {
                debug!(
                    "Detection paused, keeping {} low-EAR frames",
                    self.state.low_ear_frames
                );
            }
        }
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub fn level(&self) -> DrowsinessLevel {
        self.state.level
    }

    pub fn is_alerting(&self) -> bool {
        self.state.level == DrowsinessLevel::Alerting
    }
}
