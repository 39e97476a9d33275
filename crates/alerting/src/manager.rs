//! Alert gating

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sink::AlertSink;

/// Alert gating and playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum gap between two sounded alerts (milliseconds)
    pub cooldown_ms: u64,
    /// Sound asset played on alert
    pub sound_path: Option<String>,
    /// Player command; the sound path is appended as the last argument
    pub player: Vec<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 3000,
            sound_path: Some("music.wav".to_string()),
            player: default_player(),
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

fn default_player() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["afplay".to_string()]
    } else {
        vec!["aplay".to_string(), "-q".to_string()]
    }
}

/// Cooldown gate between sounded alerts
#[derive(Debug, Clone)]
pub struct AlertManager {
    cooldown: Duration,
    last_fired: Option<Instant>,
    fire_count: usize,
}

impl AlertManager {
    pub fn new(cooldown: Duration) -> Self {
        info!("Alert gate: cooldown {}ms", cooldown.as_millis());
        Self {
            cooldown,
            last_fired: None,
            fire_count: 0,
        }
    }

    /// Whether the cooldown has elapsed
    pub fn ready(&self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&self, now: Instant) -> bool {
        self.last_fired
            .map_or(true, |last| now.saturating_duration_since(last) >= self.cooldown)
    }

    pub fn record_fire(&mut self) {
        self.last_fired = Some(Instant::now());
        self.fire_count += 1;
        info!("Alert fired ({} so far)", self.fire_count);
    }

    /// Alerts that reached the sink
    pub fn fire_count(&self) -> usize {
        self.fire_count
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default().cooldown())
    }
}

/// What an [`Alerter::notify`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// The sink was triggered
    Sounded,
    /// Cooldown still running; nothing happened
    CoolingDown,
    /// The sink was tried and failed; the cooldown still applies
    SinkFailed,
}

/// Cooldown gate wired to a sink.
///
/// Callers keep notifying while an episode is unsounded; a notify inside the
/// cooldown is deferred, not lost.
pub struct Alerter {
    manager: AlertManager,
    sink: Box<dyn AlertSink>,
}

impl Alerter {
    pub fn new(manager: AlertManager, sink: Box<dyn AlertSink>) -> Self {
        info!("Alerts go to {}", sink.describe());
        Self { manager, sink }
    }

    /// Trigger the sink unless the cooldown is still running
    pub fn notify(&mut self) -> AlertOutcome {
        if !self.manager.ready() {
            debug!("Alert deferred by cooldown");
            return AlertOutcome::CoolingDown;
        }
        self.manager.record_fire();

        match self.sink.trigger() {
            Ok(()) => AlertOutcome::Sounded,
            Err(e) => {
                warn!("Alert sink {} failed: {}", self.sink.describe(), e);
                AlertOutcome::SinkFailed
            }
        }
    }

    pub fn manager(&self) -> &AlertManager {
        &self.manager
    }
}
