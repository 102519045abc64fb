//! HighGUI window surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use opencv::core::Mat;
use opencv::highgui;
use opencv::prelude::*;

use super::{key_from_code, DisplaySurface};
use crate::frame::Frame;

/// Shows annotated frames in a HighGUI window and reads keys from it.
pub struct OpenCvDisplay {
    quit_key: char,
    interrupt: Arc<AtomicBool>,
    bgr: Vec<u8>,
}

impl OpenCvDisplay {
    pub fn new(window: &str, quit_key: char, interrupt: Arc<AtomicBool>) -> Result<Self> {
        highgui::named_window(window, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("cannot open window '{}'", window))?;
        Ok(Self {
            quit_key,
            interrupt,
            bgr: Vec::new(),
        })
    }
}

impl DisplaySurface for OpenCvDisplay {
    fn show(&mut self, window: &str, frame: &Frame) -> Result<()> {
        // HighGUI expects BGR rows.
        self.bgr.clear();
        self.bgr.extend_from_slice(frame.as_rgb_bytes());
        for px in self.bgr.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        let flat = Mat::from_slice(&self.bgr)?;
        let mat = flat.reshape(3, frame.height() as i32)?;
        highgui::imshow(window, &*mat)?;
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<char> {
        if self.interrupt.load(Ordering::SeqCst) {
            return Some(self.quit_key);
        }
        // wait_key(0) blocks forever.
        let millis = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        match highgui::wait_key(millis) {
            Ok(code) => key_from_code(code),
            Err(err) => {
                log::warn!("key poll failed: {}", err);
                None
            }
        }
    }

    fn destroy_all(&mut self) {
        if let Err(err) = highgui::destroy_all_windows() {
            log::warn!("failed to close windows: {}", err);
        }
    }
}
