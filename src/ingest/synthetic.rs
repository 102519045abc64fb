use anyhow::{anyhow, Result};

use super::CaptureDevice;
use crate::frame::Frame;

/// Generated gradient frames for tests and demos (`stub://` sources).
///
/// The pattern shifts every frame. With `max_frames` set, reads past the
/// limit fail the way a disconnected camera would.
pub struct SyntheticCamera {
    name: String,
    width: u32,
    height: u32,
    max_frames: Option<u64>,
    frame_count: u64,
    released: bool,
}

impl SyntheticCamera {
    pub fn open(name: String, width: u32, height: u32, max_frames: Option<u64>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("synthetic camera needs a non-zero frame size"));
        }
        log::info!("SyntheticCamera: opened {} ({}x{})", name, width, height);
        Ok(Self {
            name,
            width,
            height,
            max_frames,
            frame_count: 0,
            released: false,
        })
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let (w, h) = (self.width as u64, self.height as u64);
        let shift = self.frame_count * 4;
        let mut pixels = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                pixels.push(((x * 255 / w.max(1) + shift) % 256) as u8);
                pixels.push(((y * 255 / h.max(1)) % 256) as u8);
                pixels.push(((x + y + shift) % 256) as u8);
            }
        }
        pixels
    }
}

impl CaptureDevice for SyntheticCamera {
    fn describe(&self) -> String {
        format!("{} (synthetic {}x{})", self.name, self.width, self.height)
    }

    fn read(&mut self) -> Result<Frame> {
        if self.released {
            return Err(anyhow!("{} has been released", self.name));
        }
        if let Some(max) = self.max_frames {
            if self.frame_count >= max {
                return Err(anyhow!("{} reached end of stream after {} frames", self.name, max));
            }
        }
        let pixels = self.generate_pixels();
        self.frame_count += 1;
        Frame::from_rgb(self.width, self.height, pixels)
    }

    fn release(&mut self) {
        self.released = true;
    }

    fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}
