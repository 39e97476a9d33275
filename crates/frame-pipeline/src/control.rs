//! Detection on/off switch

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Detection Enabled Flag.
///
/// Written by the control surface, read once per pipeline iteration.
#[derive(Debug, Default)]
pub struct DetectionControl {
    enabled: AtomicBool,
}

impl DetectionControl {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Turn detection on. Returns the previous state.
    pub fn enable(&self) -> bool {
        let was = self.enabled.swap(true, Ordering::Relaxed);
        if !was {
            info!("Drowsiness detection enabled");
        }
        was
    }

    /// Turn detection off. Returns the previous state.
    pub fn disable(&self) -> bool {
        let was = self.enabled.swap(false, Ordering::Relaxed);
        if was {
            info!("Drowsiness detection disabled");
        }
        was
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggles_are_idempotent() {
        let control = DetectionControl::default();
        assert!(!control.is_enabled());

        assert!(!control.enable());
        assert!(control.enable());
        assert!(control.is_enabled());

        assert!(control.disable());
        assert!(!control.disable());
        assert!(!control.is_enabled());
    }
}
