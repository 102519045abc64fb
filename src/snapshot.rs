//! Snapshot persistence for frames that contain detections.
//!
//! Files are named `snap_YYYYMMDD_HHMMSS_ffffff.jpg` from local wall-clock
//! time. When a name is already taken (clock coarser than a microsecond) a
//! `_N` suffix is appended instead of overwriting.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;

use crate::frame::Frame;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes annotated frames as JPEG files into one directory.
#[derive(Clone, Debug)]
pub struct SnapshotWriter {
    dir: PathBuf,
    quality: u8,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, quality: u8) -> Result<Self> {
        if quality == 0 || quality > 100 {
            return Err(anyhow!("jpeg quality must be within 1..=100, got {}", quality));
        }
        Ok(Self {
            dir: dir.into(),
            quality,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create snapshot dir {}", self.dir.display()))
    }

    /// Encode `frame` under a name derived from the current time.
    pub fn save(&self, frame: &Frame) -> Result<PathBuf> {
        self.save_at(frame, Local::now())
    }

    /// Encode `frame` under a name derived from `timestamp`.
    pub fn save_at(&self, frame: &Frame, timestamp: DateTime<Local>) -> Result<PathBuf> {
        self.ensure_dir()?;
        let stem = snapshot_stem(&timestamp);
        let (path, file) = self.create_unique(&stem)?;
        if let Err(err) = self.encode(frame, file) {
            let _ = fs::remove_file(&path);
            return Err(err.context(format!("failed to write snapshot {}", path.display())));
        }
        Ok(path)
    }

    fn create_unique(&self, stem: &str) -> Result<(PathBuf, File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{}.jpg", stem)
            } else {
                format!("{}_{}.jpg", stem, attempt)
            };
            let path = self.dir.join(name);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(anyhow::Error::new(err)
                        .context(format!("failed to create snapshot {}", path.display())))
                }
            }
        }
        Err(anyhow!(
            "no free snapshot name for {} in {}",
            stem,
            self.dir.display()
        ))
    }

    fn encode(&self, frame: &Frame, file: File) -> Result<()> {
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, self.quality)
            .encode_image(frame.image())
            .context("jpeg encoding failed")?;
        writer.flush().context("flush snapshot")?;
        Ok(())
    }
}

/// `snap_YYYYMMDD_HHMMSS_ffffff`.
pub fn snapshot_stem(timestamp: &DateTime<Local>) -> String {
    timestamp.format("snap_%Y%m%d_%H%M%S_%6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stem_has_microsecond_resolution() {
        let ts = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("unambiguous local time")
            + chrono::Duration::microseconds(42);
        assert_eq!(snapshot_stem(&ts), "snap_20240309_140507_000042");
    }

    #[test]
    fn quality_is_validated() {
        assert!(SnapshotWriter::new("x", 0).is_err());
        assert!(SnapshotWriter::new("x", 101).is_err());
        assert!(SnapshotWriter::new("x", 1).is_ok());
    }

    #[test]
    fn same_timestamp_gets_a_suffix() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let writer = SnapshotWriter::new(dir.path(), DEFAULT_JPEG_QUALITY)?;
        let frame = Frame::blank(16, 16);
        let ts = Local::now();

        let first = writer.save_at(&frame, ts)?;
        let second = writer.save_at(&frame, ts)?;
        assert_ne!(first, second);
        let second_name = second.file_name().and_then(|n| n.to_str()).unwrap_or("");
        assert!(second_name.ends_with("_1.jpg"), "{second_name}");
        Ok(())
    }

    #[test]
    fn missing_directory_is_created_lazily() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a").join("b");
        let writer = SnapshotWriter::new(&nested, DEFAULT_JPEG_QUALITY)?;
        let path = writer.save(&Frame::blank(8, 8))?;
        assert!(path.starts_with(&nested));
        let decoded = image::open(&path)?;
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
        Ok(())
    }
}
