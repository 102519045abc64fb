//! Class-id to color mapping.

use anyhow::{anyhow, Result};
use image::Rgb;

/// Default per-class colors: blue, green, red, cyan, magenta, yellow.
pub const DEFAULT_PALETTE: [[u8; 3]; 6] = [
    [0, 0, 255],
    [0, 255, 0],
    [255, 0, 0],
    [0, 255, 255],
    [255, 0, 255],
    [255, 255, 0],
];

/// Color of the FPS indicator.
pub const FPS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Fixed, ordered class-id to color mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb<u8>>,
}

impl Palette {
    pub fn new(colors: Vec<[u8; 3]>) -> Result<Self> {
        if colors.is_empty() {
            return Err(anyhow!("palette must contain at least one color"));
        }
        Ok(Self {
            colors: colors.into_iter().map(Rgb).collect(),
        })
    }

    /// Color for `class_id`. Negative ids wrap with the Euclidean remainder,
    /// so the mapping is periodic over all integers.
    pub fn color_for(&self, class_id: i64) -> Rgb<u8> {
        let idx = class_id.rem_euclid(self.colors.len() as i64) as usize;
        self.colors[idx]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.iter().copied().map(Rgb).collect(),
        }
    }
}
