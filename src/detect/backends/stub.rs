use anyhow::Result;

use crate::detect::backend::{DetectParams, DetectorBackend};
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Backend that never detects anything. Useful for exercising capture and
/// display without a model.
#[derive(Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame, _params: &DetectParams) -> Result<Vec<Detection>> {
        Ok(Vec::new())
    }
}
