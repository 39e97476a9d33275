//! Pipeline worker

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use alerting::{AlertOutcome, Alerter};
use camera_capture::frame::{encode_jpeg, resize_to_width, to_grayscale};
use camera_capture::{CameraError, FrameSource, VideoFrame};
use dms::{DmsAnalysis, DmsModule, LandmarkOracle};
use frame_store::{DetectionSummary, FrameStore};
use image::RgbImage;
use metrics::{counter, gauge};
use tracing::{debug, info, warn};

use crate::control::DetectionControl;
use crate::overlay;
use crate::PipelineConfig;

/// Result of one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Frame published to the store
    Published { sequence: u64, alerting: bool },
    /// Camera returned no frame; nothing published
    CaptureFailed { consecutive: u32 },
    /// Frame captured but could not be decoded or encoded; nothing published
    Dropped,
}

/// Owns everything one camera's worker needs.
pub struct FramePipeline<S, O> {
    source: S,
    dms: DmsModule<O>,
    alerter: Alerter,
    control: Arc<DetectionControl>,
    store: Arc<FrameStore>,
    config: PipelineConfig,
    /// Flag value seen on the previous iteration
    detecting: bool,
    /// Current alerting episode has reached the sink
    episode_sounded: bool,
    consecutive_failures: u32,
}

impl<S, O> FramePipeline<S, O>
where
    S: FrameSource,
    O: LandmarkOracle,
{
    pub fn new(
        source: S,
        dms: DmsModule<O>,
        alerter: Alerter,
        control: Arc<DetectionControl>,
        store: Arc<FrameStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            dms,
            alerter,
            control,
            store,
            config,
            detecting: false,
            episode_sounded: false,
            consecutive_failures: 0,
        }
    }

    /// Run one iteration: acquire, process, publish
    pub fn step(&mut self) -> StepOutcome {
        let frame = match self.source.read_frame() {
            Ok(frame) => {
                if self.consecutive_failures > 0 {
                    info!(
                        "Camera {} recovered after {} failed reads",
                        self.source.device(),
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                frame
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                counter!("pipeline_capture_failures_total").increment(1);
                if self.consecutive_failures == 1 {
                    warn!("Frame capture failed on {}: {}", self.source.device(), e);
                } else {
                    debug!("Frame capture failed ({} in a row): {}", self.consecutive_failures, e);
                }
                return StepOutcome::CaptureFailed {
                    consecutive: self.consecutive_failures,
                };
            }
        };

        match self.process(frame) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Dropping frame: {}", e);
                StepOutcome::Dropped
            }
        }
    }

    fn process(&mut self, frame: VideoFrame) -> Result<StepOutcome, CameraError> {
        let img = frame.into_rgb_image()?;
        let mut img = resize_to_width(&img, self.config.target_width);

        let detection = if self.sync_detection_flag() {
            self.detect(&mut img)
        } else {
            None
        };
        let alerting = detection.as_ref().is_some_and(|d| d.alerting);

        let jpeg = encode_jpeg(&img, self.config.jpeg_quality)?;
        let sequence = self
            .store
            .publish(jpeg, img.width(), img.height(), detection);
        counter!("pipeline_frames_total").increment(1);

        Ok(StepOutcome::Published { sequence, alerting })
    }

    /// Picks up flag changes; pauses the debounce state on disable
    fn sync_detection_flag(&mut self) -> bool {
        let enabled = self.control.is_enabled();
        if enabled != self.detecting {
            if enabled {
                info!("Pipeline detection resumed");
            } else {
                info!("Pipeline detection paused");
                self.dms.pause();
                if !self.dms.monitor().is_alerting() {
                    self.episode_sounded = false;
                }
            }
            self.detecting = enabled;
        }
        enabled
    }

    fn detect(&mut self, img: &mut RgbImage) -> Option<DetectionSummary> {
        let gray = to_grayscale(img);
        let analysis = match self.dms.analyze(&gray) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Face detection failed, publishing without overlay: {}", e);
                return None;
            }
        };

        overlay::annotate(img, &analysis);

        self.sound_alert(analysis.is_alerting());
        if let Some(ear) = analysis.tracked_ear() {
            gauge!("pipeline_ear").set(ear as f64);
        }

        Some(summarize(&analysis))
    }

    /// Sound once per episode; retried every frame until the sink plays
    fn sound_alert(&mut self, alerting: bool) {
        if !alerting {
            self.episode_sounded = false;
            return;
        }
        if self.episode_sounded {
            return;
        }
        match self.alerter.notify() {
            AlertOutcome::Sounded => {
                self.episode_sounded = true;
                counter!("pipeline_alerts_fired_total").increment(1);
            }
            AlertOutcome::SinkFailed => {
                counter!("pipeline_alert_sink_failures_total").increment(1);
            }
            AlertOutcome::CoolingDown => {}
        }
    }

    /// Consecutive capture failures so far
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn dms(&self) -> &DmsModule<O> {
        &self.dms
    }

    pub fn alerter(&self) -> &Alerter {
        &self.alerter
    }

    /// Loop forever at the camera's cadence
    pub fn run(mut self) {
        info!(
            "Frame pipeline running on {} (width {}, quality {})",
            self.source.device(),
            self.config.target_width,
            self.config.jpeg_quality
        );
        loop {
            if let StepOutcome::CaptureFailed { consecutive } = self.step() {
                if let Some(delay) = self.config.backoff(consecutive) {
                    thread::sleep(delay);
                }
            }
        }
    }
}

impl<S, O> FramePipeline<S, O>
where
    S: FrameSource + 'static,
    O: LandmarkOracle + 'static,
{
    /// Start the worker on its own named thread
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("frame-pipeline".to_string())
            .spawn(move || self.run())
    }
}

fn summarize(analysis: &DmsAnalysis) -> DetectionSummary {
    DetectionSummary {
        faces_detected: analysis.faces_detected,
        faces_scored: analysis.readings.len(),
        tracked_ear: analysis.tracked_ear(),
        low_ear_frames: analysis.low_ear_frames,
        alerting: analysis.is_alerting(),
    }
}
