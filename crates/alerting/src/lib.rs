//! Alerting System
//!
//! Gates drowsiness alerts by cooldown and plays them through a sink.

mod manager;
mod sink;

pub use manager::{AlertConfig, AlertManager, AlertOutcome, Alerter};
pub use sink::{sink_from_config, AlertSink, CommandSink, LogSink};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Alert asset not found: {0}")]
    AssetMissing(String),

    #[error("Playback failed: {0}")]
    Playback(String),
}
