//! Audible alert sinks

use std::path::Path;
use std::process::{Child, Command, Stdio};

use tracing::{debug, info, warn};

use crate::manager::AlertConfig;
use crate::AlertError;

/// Side-effect target for a fired alert
pub trait AlertSink: Send {
    /// Start the alert. Must not block on playback.
    fn trigger(&mut self) -> Result<(), AlertError>;

    fn describe(&self) -> String;
}

/// Logs the alert and nothing else
#[derive(Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn trigger(&mut self) -> Result<(), AlertError> {
        warn!("ALERT: driver drowsiness detected");
        Ok(())
    }

    fn describe(&self) -> String {
        "log".to_string()
    }
}

/// Plays a sound by spawning an external player.
///
/// A trigger while the previous playback is still running is a no-op, so
/// alerts never overlap.
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    current: Option<Child>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current: None,
        }
    }

    /// Whether a previously spawned player is still running
    pub fn is_playing(&mut self) -> bool {
        let Some(child) = self.current.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!("Alert player exited with {}", status);
                self.current = None;
                false
            }
            Err(e) => {
                warn!("Could not poll alert player: {}", e);
                self.current = None;
                false
            }
        }
    }
}

impl AlertSink for CommandSink {
    fn trigger(&mut self) -> Result<(), AlertError> {
        if self.is_playing() {
            debug!("Alert sound already playing");
            return Ok(());
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AlertError::Playback(format!("{}: {}", self.program, e)))?;
        self.current = Some(child);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

impl Drop for CommandSink {
    fn drop(&mut self) {
        if let Some(child) = self.current.as_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Build the sink described by the configuration.
///
/// A missing sound asset or an empty player command degrades to [`LogSink`].
pub fn sink_from_config(config: &AlertConfig) -> Box<dyn AlertSink> {
    let Some(sound) = config.sound_path.as_deref() else {
        info!("No alert sound configured, alerts will only be logged");
        return Box::new(LogSink);
    };

    if !Path::new(sound).exists() {
        warn!("{}, alerts will only be logged", AlertError::AssetMissing(sound.to_string()));
        return Box::new(LogSink);
    }

    let Some((program, rest)) = config.player.split_first() else {
        warn!("Empty alert player command, alerts will only be logged");
        return Box::new(LogSink);
    };

    let mut args = rest.to_vec();
    args.push(sound.to_string());
    Box::new(CommandSink::new(program.clone(), args))
}
