use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::{DetectParams, DetectorBackend};
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Replays a fixed sequence of per-frame detection lists, one list per call.
///
/// Once the script is exhausted every further frame yields no detections.
pub struct ScriptedBackend {
    script: VecDeque<Vec<Detection>>,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
        }
    }

    /// Number of `detect` calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame, _params: &DetectParams) -> Result<Vec<Detection>> {
        self.calls += 1;
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;

    #[test]
    fn replays_then_goes_quiet() -> Result<()> {
        let person = Detection::new(BoundingBox::new(0, 0, 4, 4)?, 0, "person", 0.9);
        let mut backend = ScriptedBackend::new(vec![vec![person.clone()], vec![]]);
        let frame = Frame::blank(8, 8);
        let params = DetectParams::default();

        assert_eq!(backend.detect(&frame, &params)?, vec![person]);
        assert!(backend.detect(&frame, &params)?.is_empty());
        assert!(backend.detect(&frame, &params)?.is_empty());
        assert_eq!(backend.calls(), 3);
        Ok(())
    }
}
