//! live-annotator
//!
//! Real-time annotation loop for a single live camera feed:
//! - frames are pulled from a capture device (`ingest`)
//! - each frame goes through a detector backend (`detect`)
//! - boxes, labels and a smoothed FPS readout are drawn in place (`overlay`, `fps`)
//! - per-class counts are aggregated for the session (`aggregate`)
//! - frames with detections are written as JPEG snapshots (`snapshot`)
//! - iterations are capped at a target rate (`rate`)
//!
//! `runtime::FrameLoop` ties these together and owns them for one session.

pub mod aggregate;
pub mod config;
pub mod detect;
pub mod display;
pub mod fps;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod rate;
pub mod runtime;
pub mod snapshot;

pub use aggregate::{DetectionAggregator, FrameCounters, SessionCounters};
pub use config::AnnotatorConfig;
pub use detect::{BoundingBox, DetectParams, Detection, DetectorBackend};
pub use display::{open_display, DisplaySurface, HeadlessDisplay};
pub use fps::FpsEstimator;
pub use frame::Frame;
pub use ingest::{open_capture, CaptureDevice};
pub use overlay::{Overlay, Palette};
pub use rate::RateLimiter;
pub use runtime::{FrameLoop, LoopSettings, LoopState, SessionReport, StopReason};
pub use snapshot::SnapshotWriter;
