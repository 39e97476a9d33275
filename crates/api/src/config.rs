//! Server configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `DROWSY_*` environment variables (`__` separates sections, e.g.
//! `DROWSY_SERVER__BIND=0.0.0.0:9000`).

use std::path::Path;
use std::time::Duration;

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use config::{Config, ConfigError, Environment, File};
use dms::DmsConfig;
use frame_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Config file read when `DROWSY_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/drowsiness.toml";
pub const CONFIG_PATH_ENV: &str = "DROWSY_CONFIG";
const ENV_PREFIX: &str = "DROWSY";

/// Everything the server binary needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub camera: CameraSection,
    pub dms: DmsConfig,
    pub alert: AlertConfig,
    pub pipeline: PipelineConfig,
    pub stream: StreamConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Detection state at startup
    pub start_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            start_enabled: false,
        }
    }
}

/// Camera selection and capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSection {
    /// Probed in order; the first that captures a frame wins
    pub devices: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Pause between opening the camera and starting the pipeline
    pub warmup_ms: u64,
}

impl Default for CameraSection {
    fn default() -> Self {
        let capture = CameraConfig::default();
        Self {
            devices: (0..3).map(|i| format!("/dev/video{}", i)).collect(),
            width: capture.width,
            height: capture.height,
            fps: capture.fps,
            warmup_ms: 2000,
        }
    }
}

impl CameraSection {
    /// Capture settings for the first configured device
    pub fn capture_config(&self) -> CameraConfig {
        CameraConfig {
            device: self
                .devices
                .first()
                .cloned()
                .unwrap_or_else(|| CameraConfig::default().device),
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

/// MJPEG stream pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Delay between parts sent to one client
    pub frame_interval_ms: u64,
    /// Re-poll delay while no frame has been published yet
    pub empty_poll_ms: u64,
    /// Parts buffered per client before the sampler waits
    pub client_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33,
            empty_poll_ms: 100,
            client_buffer: 2,
        }
    }
}

impl StreamConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn empty_poll(&self) -> Duration {
        Duration::from_millis(self.empty_poll_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load from `DROWSY_CONFIG` (or the default path) plus the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from a specific file. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("camera.devices")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms::DisablePolicy;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.server.cors_origins.len(), 4);
        assert!(!config.server.start_enabled);
        assert_eq!(config.camera.devices, vec!["/dev/video0", "/dev/video1", "/dev/video2"]);
        assert_eq!(config.camera.warmup(), Duration::from_secs(2));
        assert_eq!(config.stream.frame_interval(), Duration::from_millis(33));
        assert_eq!(config.stream.empty_poll(), Duration::from_millis(100));
        assert_eq!(config.pipeline.target_width, 450);
        assert_eq!(config.dms.frame_check, 20);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/drowsiness.toml")).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.dms.ear_threshold, 0.25);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("drowsy-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
bind = "127.0.0.1:9100"

[camera]
devices = ["stub://test"]
warmup_ms = 0

[dms]
frame_check = 10
disable_policy = "preserve"

[stream]
frame_interval_ms = 50
"#
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.bind, "127.0.0.1:9100");
        assert_eq!(config.camera.devices, vec!["stub://test"]);
        assert_eq!(config.camera.warmup_ms, 0);
        // untouched keys keep their defaults
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.dms.frame_check, 10);
        assert_eq!(config.dms.disable_policy, DisablePolicy::Preserve);
        assert_eq!(config.dms.ear_threshold, 0.25);
        assert_eq!(config.stream.frame_interval_ms, 50);
        assert_eq!(config.stream.empty_poll_ms, 100);
    }

    #[test]
    fn test_capture_config_uses_first_device() {
        let section = CameraSection {
            devices: vec!["stub://cam".to_string(), "/dev/video4".to_string()],
            width: 320,
            height: 240,
            ..Default::default()
        };
        let capture = section.capture_config();
        assert_eq!(capture.device, "stub://cam");
        assert_eq!((capture.width, capture.height), (320, 240));
        assert!(capture.is_synthetic());

        let empty = CameraSection { devices: vec![], ..Default::default() };
        assert_eq!(empty.capture_config().device, "/dev/video0");
    }
}
