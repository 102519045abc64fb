//! The real-time frame loop.
//!
//! One iteration: acquire, detect, annotate, aggregate, snapshot, FPS
//! overlay, display, poll quit, rate-limit. Everything runs on the calling
//! thread; the loop exclusively owns the capture device, detector, display
//! and session counters for the whole run.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::aggregate::{DetectionAggregator, FrameCounters, SessionCounters};
use crate::config::AnnotatorConfig;
use crate::detect::{DetectParams, DetectorBackend};
use crate::display::DisplaySurface;
use crate::fps::FpsEstimator;
use crate::ingest::CaptureDevice;
use crate::overlay::Overlay;
use crate::rate::RateLimiter;
use crate::snapshot::SnapshotWriter;

/// How long each iteration waits for a key press.
pub const KEY_POLL_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopping,
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The capture device failed to deliver a frame.
    EndOfStream,
    /// The operator pressed the quit key.
    OperatorQuit,
}

/// Loop parameters that are not components.
#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub window_name: String,
    pub quit_key: char,
    pub detect: DetectParams,
}

impl LoopSettings {
    pub fn from_config(cfg: &AnnotatorConfig) -> Self {
        Self {
            window_name: cfg.display.window_name.clone(),
            quit_key: cfg.display.quit_key,
            detect: cfg.detect_params(),
        }
    }
}

/// Outcome of one run, produced once at shutdown.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionReport {
    pub frames_processed: u64,
    /// Frames with at least one detection; one summary line was logged for each.
    pub frames_with_detections: u64,
    pub snapshots: Vec<PathBuf>,
    pub snapshot_failures: u64,
    pub detector_failures: u64,
    pub stop_reason: Option<StopReason>,
    pub counters: SessionCounters,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session complete. Total objects detected:")?;
        write!(f, "{}", self.counters)
    }
}

pub struct FrameLoop {
    capture: Box<dyn CaptureDevice>,
    detector: Box<dyn DetectorBackend>,
    display: Box<dyn DisplaySurface>,
    snapshots: SnapshotWriter,
    overlay: Overlay,
    rate: RateLimiter,
    fps: FpsEstimator,
    aggregator: DetectionAggregator,
    last_counters: FrameCounters,
    settings: LoopSettings,
    state: LoopState,
    frame_index: u64,
    frames_with_detections: u64,
    saved: Vec<PathBuf>,
    snapshot_failures: u64,
    detector_failures: u64,
    stop_reason: Option<StopReason>,
    report: Option<SessionReport>,
}

impl FrameLoop {
    /// Build a loop around an already opened capture device. The loop starts
    /// in `Running`.
    pub fn new(
        capture: Box<dyn CaptureDevice>,
        detector: Box<dyn DetectorBackend>,
        display: Box<dyn DisplaySurface>,
        snapshots: SnapshotWriter,
        overlay: Overlay,
        rate: RateLimiter,
        settings: LoopSettings,
    ) -> Self {
        log::info!(
            "frame loop running: source={} detector={} max_rate={:.1}Hz",
            capture.describe(),
            detector.name(),
            1.0 / rate.min_interval().as_secs_f64()
        );
        Self {
            capture,
            detector,
            display,
            snapshots,
            overlay,
            rate,
            fps: FpsEstimator::new(Instant::now()),
            aggregator: DetectionAggregator::new(),
            last_counters: FrameCounters::default(),
            settings,
            state: LoopState::Running,
            frame_index: 0,
            frames_with_detections: 0,
            saved: Vec::new(),
            snapshot_failures: 0,
            detector_failures: 0,
            stop_reason: None,
            report: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames fully processed so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn session(&self) -> &SessionCounters {
        self.aggregator.session()
    }

    /// Per-class counts of the most recently processed frame.
    pub fn last_frame_counters(&self) -> &FrameCounters {
        &self.last_counters
    }

    /// Run one iteration. Does nothing unless the loop is `Running`.
    pub fn step(&mut self) -> LoopState {
        if self.state != LoopState::Running {
            return self.state;
        }
        let started = Instant::now();

        let mut frame = match self.capture.read() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame grab failed: {:#}. stopping", err);
                self.stop(StopReason::EndOfStream);
                return self.state;
            }
        };

        let detections = match self.detector.detect(&frame, &self.settings.detect) {
            Ok(detections) => detections,
            Err(err) => {
                self.detector_failures += 1;
                log::warn!(
                    "detector {} failed on frame {}: {:#}",
                    self.detector.name(),
                    self.frame_index,
                    err
                );
                Vec::new()
            }
        };

        self.overlay.annotate_detections(&mut frame, &detections);

        let counters = self.aggregator.ingest(&detections);
        if !counters.is_empty() {
            self.frames_with_detections += 1;
            log::info!("{}", counters.summary_line(self.frame_index));
            match self.snapshots.save(&frame) {
                Ok(path) => {
                    log::info!("snapshot saved: {}", path.display());
                    self.saved.push(path);
                }
                Err(err) => {
                    self.snapshot_failures += 1;
                    log::error!("snapshot failed: {:#}", err);
                }
            }
        }
        self.last_counters = counters;

        let fps = self.fps.update(Instant::now());
        self.overlay.draw_fps(&mut frame, fps);

        if let Err(err) = self.display.show(&self.settings.window_name, &frame) {
            log::warn!("display failed on frame {}: {:#}", self.frame_index, err);
        }
        self.frame_index += 1;

        if self.display.poll_key(KEY_POLL_TIMEOUT) == Some(self.settings.quit_key) {
            log::info!("quit key pressed. stopping");
            self.stop(StopReason::OperatorQuit);
            return self.state;
        }

        let pause = self.rate.sleep_duration(started, Instant::now());
        log::debug!(
            "frame {} took {:?}, sleeping {:?}",
            self.frame_index - 1,
            started.elapsed(),
            pause
        );
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
        self.state
    }

    fn stop(&mut self, reason: StopReason) {
        if self.state == LoopState::Running {
            self.stop_reason = Some(reason);
            self.state = LoopState::Stopping;
        }
    }

    /// Release the device, close the display and produce the session report.
    ///
    /// Cleanup happens once; later calls return the same report.
    pub fn shutdown(&mut self) -> SessionReport {
        if let Some(report) = &self.report {
            return report.clone();
        }
        self.state = LoopState::Stopping;
        self.capture.release();
        self.display.destroy_all();

        let report = SessionReport {
            frames_processed: self.frame_index,
            frames_with_detections: self.frames_with_detections,
            snapshots: self.saved.clone(),
            snapshot_failures: self.snapshot_failures,
            detector_failures: self.detector_failures,
            stop_reason: self.stop_reason,
            counters: self.aggregator.session().clone(),
        };
        log::info!(
            "session ended after {} frames ({} with detections, {} snapshots)",
            report.frames_processed,
            report.frames_with_detections,
            report.snapshots.len()
        );
        self.state = LoopState::Terminated;
        self.report = Some(report.clone());
        report
    }

    /// Iterate until the loop stops, then shut down.
    pub fn run(mut self) -> SessionReport {
        while self.step() == LoopState::Running {}
        self.shutdown()
    }

    /// Warm the detector before the first frame.
    pub fn warm_up(&mut self) -> Result<()> {
        self.detector.warm_up()
    }
}
