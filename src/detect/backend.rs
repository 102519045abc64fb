use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Inference parameters, constant for a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectParams {
    /// Square model input size in pixels.
    pub resolution: u32,
    /// Minimum score kept (inclusive).
    pub confidence_threshold: f32,
    /// Same-class boxes overlapping by more than this are suppressed.
    pub iou_threshold: f32,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            resolution: 480,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        }
    }
}

/// Object-detection capability.
///
/// The frame loop treats a backend as an opaque, synchronous call: a frame
/// goes in, a (possibly empty) list of detections in frame coordinates comes
/// out. Implementations must not retain the frame beyond the call.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame, params: &DetectParams) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
