//! Frame container.
//!
//! A `Frame` is one RGB image sampled from the capture device. It is owned by
//! exactly one loop iteration: the detector reads it, the overlay step
//! annotates it in place, and the snapshot writer encodes it read-only.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// One still image from the live stream.
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("pixel buffer does not fit {}x{}", width, height))?;
        Ok(Self { image })
    }

    /// Solid-color frame, mostly for tests and synthetic sources.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Packed RGB24 pixel data, row-major.
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb_validates_length() {
        assert!(Frame::from_rgb(2, 2, vec![0u8; 12]).is_ok());
        let err = Frame::from_rgb(2, 2, vec![0u8; 11]).err().expect("length error");
        assert!(err.to_string().contains("expected 12 RGB bytes"));
    }

    #[test]
    fn blank_frame_has_requested_size() {
        let frame = Frame::blank(64, 48);
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.as_rgb_bytes().len(), 64 * 48 * 3);
    }
}
