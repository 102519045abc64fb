//! Display surfaces and operator input.
//!
//! - `HeadlessDisplay`: no window, Ctrl-C acts as the quit key
//! - `OpenCvDisplay`: HighGUI window and keyboard (feature: display-opencv)

#[cfg(feature = "display-opencv")]
mod opencv;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::DisplaySettings;
use crate::frame::Frame;

#[cfg(feature = "display-opencv")]
pub use self::opencv::OpenCvDisplay;

/// Where annotated frames are presented and where the quit key is read.
pub trait DisplaySurface {
    /// Present `frame` in the window called `window`.
    fn show(&mut self, window: &str, frame: &Frame) -> Result<()>;

    /// Wait up to `timeout` for a key press.
    fn poll_key(&mut self, timeout: Duration) -> Option<char>;

    /// Close every window this surface opened.
    fn destroy_all(&mut self);
}

/// Window-less surface for terminals and services.
///
/// Frames are counted, not rendered. The quit key is reported once the shared
/// interrupt flag is raised (typically by a Ctrl-C handler).
pub struct HeadlessDisplay {
    interrupt: Arc<AtomicBool>,
    quit_key: char,
    frames_shown: u64,
    closed: bool,
}

impl HeadlessDisplay {
    pub fn new(interrupt: Arc<AtomicBool>, quit_key: char) -> Self {
        Self {
            interrupt,
            quit_key,
            frames_shown: 0,
            closed: false,
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl DisplaySurface for HeadlessDisplay {
    fn show(&mut self, window: &str, frame: &Frame) -> Result<()> {
        self.frames_shown += 1;
        log::trace!(
            "{}: frame {} ({}x{})",
            window,
            self.frames_shown,
            frame.width(),
            frame.height()
        );
        Ok(())
    }

    fn poll_key(&mut self, _timeout: Duration) -> Option<char> {
        if self.interrupt.load(Ordering::SeqCst) {
            Some(self.quit_key)
        } else {
            None
        }
    }

    fn destroy_all(&mut self) {
        self.closed = true;
    }
}

/// Map a raw key code from a window toolkit to a character. Negative codes
/// mean no key was pressed; modifier bits above the low byte are ignored.
pub fn key_from_code(code: i32) -> Option<char> {
    if code < 0 {
        return None;
    }
    char::from_u32((code & 0xFF) as u32)
}

/// Open the surface selected by `settings`: a window when one is compiled in
/// and not disabled, otherwise headless. `interrupt` is honoured by both as
/// a quit request.
pub fn open_display(
    settings: &DisplaySettings,
    interrupt: Arc<AtomicBool>,
) -> Result<Box<dyn DisplaySurface>> {
    if settings.headless {
        log::info!("display: headless");
        return Ok(Box::new(HeadlessDisplay::new(interrupt, settings.quit_key)));
    }
    open_window(settings, interrupt)
}

#[cfg(feature = "display-opencv")]
fn open_window(
    settings: &DisplaySettings,
    interrupt: Arc<AtomicBool>,
) -> Result<Box<dyn DisplaySurface>> {
    log::info!(
        "display: window '{}' (press '{}' to quit)",
        settings.window_name,
        settings.quit_key
    );
    Ok(Box::new(OpenCvDisplay::new(
        &settings.window_name,
        settings.quit_key,
        interrupt,
    )?))
}

#[cfg(not(feature = "display-opencv"))]
fn open_window(
    settings: &DisplaySettings,
    interrupt: Arc<AtomicBool>,
) -> Result<Box<dyn DisplaySurface>> {
    log::warn!("display: built without display-opencv, running headless. Ctrl-C to quit");
    Ok(Box::new(HeadlessDisplay::new(interrupt, settings.quit_key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_codes_map_to_characters() {
        assert_eq!(key_from_code(-1), None);
        assert_eq!(key_from_code('q' as i32), Some('q'));
        assert_eq!(key_from_code(27), Some('\u{1b}'));
        // Some HighGUI backends set modifier flags above the low byte.
        assert_eq!(key_from_code(0x10_0000 | 'x' as i32), Some('x'));
    }

    #[test]
    fn headless_setting_selects_headless_surface() -> Result<()> {
        let settings = DisplaySettings {
            headless: true,
            ..DisplaySettings::default()
        };
        let flag = Arc::new(AtomicBool::new(true));
        let mut display = open_display(&settings, flag)?;
        display.show("w", &Frame::blank(2, 2))?;
        assert_eq!(
            display.poll_key(Duration::from_millis(1)),
            Some(settings.quit_key)
        );
        display.destroy_all();
        Ok(())
    }

    #[test]
    fn interrupt_flag_maps_to_quit_key() -> Result<()> {
        let flag = Arc::new(AtomicBool::new(false));
        let mut display = HeadlessDisplay::new(flag.clone(), 'q');
        display.show("w", &Frame::blank(2, 2))?;
        assert_eq!(display.poll_key(Duration::from_millis(1)), None);

        flag.store(true, Ordering::SeqCst);
        assert_eq!(display.poll_key(Duration::from_millis(1)), Some('q'));
        assert_eq!(display.frames_shown(), 1);

        display.destroy_all();
        assert!(display.is_closed());
        Ok(())
    }
}
