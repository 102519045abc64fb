use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::{DetectParams, DetectorBackend};
use crate::detect::labels::ClassNames;
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::Frame;

/// Chance that a frame carries any detections at all.
const DETECTION_PROBABILITY: f64 = 0.3;
/// Synthetic classes are drawn from the first few names only.
const CLASS_POOL: u32 = 6;

/// Seeded random detector for demos without a model file.
///
/// Scores are drawn above the confidence threshold so every emitted box
/// survives the same filter a real backend would apply.
pub struct SyntheticBackend {
    rng: StdRng,
    names: ClassNames,
}

impl SyntheticBackend {
    pub fn new(seed: Option<u64>, names: ClassNames) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, names }
    }

    fn random_box(&mut self, width: u32, height: u32) -> Option<BoundingBox> {
        if width < 4 || height < 4 {
            return None;
        }
        let (w, h) = (width as i32, height as i32);
        let x1 = self.rng.gen_range(0..w - 2);
        let y1 = self.rng.gen_range(0..h - 2);
        let x2 = self.rng.gen_range(x1 + 1..w);
        let y2 = self.rng.gen_range(y1 + 1..h);
        BoundingBox::new(x1, y1, x2, y2).ok()
    }
}

impl DetectorBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn detect(&mut self, frame: &Frame, params: &DetectParams) -> Result<Vec<Detection>> {
        if !self.rng.gen_bool(DETECTION_PROBABILITY) {
            return Ok(Vec::new());
        }
        let count = self.rng.gen_range(1..=2);
        let pool = CLASS_POOL.min(self.names.len() as u32).max(1);
        let floor = params.confidence_threshold.clamp(0.0, 1.0);
        let mut detections = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(bbox) = self.random_box(frame.width(), frame.height()) else {
                continue;
            };
            let class_id = self.rng.gen_range(0..pool);
            let confidence = if floor >= 1.0 {
                1.0
            } else {
                self.rng.gen_range(floor..=1.0)
            };
            detections.push(Detection::new(
                bbox,
                class_id,
                self.names.name(class_id),
                confidence,
            ));
        }
        Ok(detections)
    }
}
