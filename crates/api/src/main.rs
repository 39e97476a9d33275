//! Drowsiness Monitor - Main Entry Point

use std::sync::Arc;

use alerting::{sink_from_config, AlertManager, Alerter};
use anyhow::Context;
use api::{init_logging, install_metrics, run_server, AppConfig, AppState};
use camera_capture::{failure_summary, probe, CameraError, FrameSource};
use dms::{DmsModule, OnnxLandmarkOracle};
use frame_pipeline::{DetectionControl, FramePipeline};
use frame_store::FrameStore;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = match install_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {:#}", e);
            None
        }
    };

    // First device that opens and captures a frame
    let base = config.camera.capture_config();
    let devices = config.camera.devices.clone();
    let (source, reports) = tokio::task::spawn_blocking({
        let devices = devices.clone();
        move || probe(&base, &devices)
    })
    .await
    .context("camera probe panicked")?;
    if let Some(failed) = failure_summary(&reports) {
        warn!("Unusable cameras: {}", failed);
    }
    let source = source.ok_or_else(|| CameraError::NoDevice(devices.join(", ")))?;
    info!("Using camera {}", source.device());

    let warmup = config.camera.warmup();
    if !warmup.is_zero() {
        info!("Warming up camera for {}ms", warmup.as_millis());
        tokio::time::sleep(warmup).await;
    }

    let oracle =
        OnnxLandmarkOracle::from_config(&config.dms).context("Failed to load face models")?;
    let alerter = Alerter::new(
        AlertManager::new(config.alert.cooldown()),
        sink_from_config(&config.alert),
    );

    let control = Arc::new(DetectionControl::new(config.server.start_enabled));
    let store = Arc::new(FrameStore::new());

    FramePipeline::new(
        source,
        DmsModule::new(config.dms.clone(), oracle),
        alerter,
        control.clone(),
        store.clone(),
        config.pipeline.clone(),
    )
    .spawn()
    .context("Failed to start frame pipeline")?;

    let state = Arc::new(AppState::new(control, store, config.stream.clone(), metrics));
    run_server(state, &config.server).await
}
