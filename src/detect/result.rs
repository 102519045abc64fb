use anyhow::{anyhow, Result};

/// Axis-aligned box in frame pixel coordinates. Always `x1 < x2` and `y1 < y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        if x1 >= x2 || y1 >= y2 {
            return Err(anyhow!(
                "degenerate bounding box ({}, {}) - ({}, {})",
                x1,
                y1,
                x2,
                y2
            ));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn x1(&self) -> i32 {
        self.x1
    }

    pub fn y1(&self) -> i32 {
        self.y1
    }

    pub fn x2(&self) -> i32 {
        self.x2
    }

    pub fn y2(&self) -> i32 {
        self.y2
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// One object instance found in a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub class_name: String,
    /// Score in [0, 1].
    pub confidence: f32,
}

impl Detection {
    pub fn new(
        bbox: BoundingBox,
        class_id: u32,
        class_name: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            bbox,
            class_id,
            class_name: class_name.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Overlay label, e.g. `person 0.90`.
    pub fn label(&self) -> String {
        format!("{} {:.2}", self.class_name, self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_rejects_degenerate_extents() {
        assert!(BoundingBox::new(0, 0, 10, 10).is_ok());
        assert!(BoundingBox::new(10, 0, 10, 10).is_err());
        assert!(BoundingBox::new(0, 12, 10, 10).is_err());
    }

    #[test]
    fn label_uses_two_decimals() -> Result<()> {
        let det = Detection::new(BoundingBox::new(1, 2, 3, 4)?, 0, "person", 0.906);
        assert_eq!(det.label(), "person 0.91");
        let det = Detection::new(BoundingBox::new(1, 2, 3, 4)?, 0, "person", 0.5);
        assert_eq!(det.label(), "person 0.50");
        let det = Detection::new(BoundingBox::new(1, 2, 3, 4)?, 2, "car", 1.7);
        assert_eq!(det.confidence, 1.0);
        Ok(())
    }
}
