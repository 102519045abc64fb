//! Frame capture devices.
//!
//! Sources produce `Frame`s for the loop:
//! - synthetic camera (`stub://name`), always available
//! - a local directory of JPEG/PNG stills
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//!
//! `read` blocks until a frame is available. Any error from `read` is treated
//! by the loop as end of stream.

mod dir;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use std::path::Path;

use anyhow::{anyhow, Result};

use crate::config::CaptureSettings;
use crate::frame::Frame;

pub use dir::ImageDirSource;
pub use synthetic::SyntheticCamera;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Camera;

/// An opened capture device.
pub trait CaptureDevice {
    /// Human-readable source description for logs.
    fn describe(&self) -> String;

    /// Acquire the next frame.
    fn read(&mut self) -> Result<Frame>;

    /// Release the underlying device. Further reads fail.
    fn release(&mut self);

    /// Frames delivered so far.
    fn frames_captured(&self) -> u64;
}

/// Kind of source named by a capture string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Synthetic(String),
    Directory(String),
    Device(String),
}

impl SourceKind {
    /// `stub://x` is synthetic, a bare integer is `/dev/video<N>`, an existing
    /// directory is a still-image source, anything else is a device path.
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        if source.is_empty() {
            return Err(anyhow!("capture source is empty"));
        }
        if source.starts_with("stub://") {
            return Ok(SourceKind::Synthetic(source.to_string()));
        }
        if source.contains("://") {
            return Err(anyhow!(
                "capture source {} is a URL; only local devices are supported",
                source
            ));
        }
        if let Ok(index) = source.parse::<u32>() {
            return Ok(SourceKind::Device(format!("/dev/video{}", index)));
        }
        if Path::new(source).is_dir() {
            return Ok(SourceKind::Directory(source.to_string()));
        }
        Ok(SourceKind::Device(source.to_string()))
    }
}

/// Open the configured capture source. Failure here is fatal to the caller.
pub fn open_capture(settings: &CaptureSettings) -> Result<Box<dyn CaptureDevice>> {
    match SourceKind::parse(&settings.source)? {
        SourceKind::Synthetic(name) => Ok(Box::new(SyntheticCamera::open(
            name,
            settings.width,
            settings.height,
            settings.max_frames,
        )?)),
        SourceKind::Directory(path) => Ok(Box::new(ImageDirSource::open(
            path,
            settings.width,
            settings.height,
        )?)),
        SourceKind::Device(path) => open_device(path, settings),
    }
}

#[cfg(feature = "ingest-v4l2")]
fn open_device(path: String, settings: &CaptureSettings) -> Result<Box<dyn CaptureDevice>> {
    Ok(Box::new(V4l2Camera::open(
        path,
        settings.width,
        settings.height,
        settings.device_fps,
    )?))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_device(path: String, _settings: &CaptureSettings) -> Result<Box<dyn CaptureDevice>> {
    Err(anyhow!(
        "cannot open camera {}: device capture requires the ingest-v4l2 feature",
        path
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_source_kinds() -> Result<()> {
        assert_eq!(
            SourceKind::parse("stub://front")?,
            SourceKind::Synthetic("stub://front".into())
        );
        assert_eq!(
            SourceKind::parse("0")?,
            SourceKind::Device("/dev/video0".into())
        );
        assert_eq!(
            SourceKind::parse("/dev/video2")?,
            SourceKind::Device("/dev/video2".into())
        );
        let dir = tempfile::tempdir()?;
        let dir_str = dir.path().to_string_lossy().to_string();
        assert_eq!(SourceKind::parse(&dir_str)?, SourceKind::Directory(dir_str));
        assert!(SourceKind::parse("rtsp://camera").is_err());
        assert!(SourceKind::parse("  ").is_err());
        Ok(())
    }

    #[test]
    fn open_synthetic_capture() -> Result<()> {
        let settings = CaptureSettings {
            source: "stub://test".into(),
            width: 32,
            height: 24,
            max_frames: Some(1),
            ..CaptureSettings::default()
        };
        let mut capture = open_capture(&settings)?;
        let frame = capture.read()?;
        assert_eq!((frame.width(), frame.height()), (32, 24));
        assert!(capture.read().is_err());
        Ok(())
    }
}
