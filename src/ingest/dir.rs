//! Still-image directory source.
//!
//! Plays the JPEG/PNG files of a local directory in lexical order, one per
//! read. Running out of files is end of stream.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};

use super::CaptureDevice;
use crate::frame::Frame;

const EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
    width: u32,
    height: u32,
    released: bool,
}

impl ImageDirSource {
    pub fn open(dir: impl Into<PathBuf>, width: u32, height: u32) -> Result<Self> {
        let dir = dir.into();
        let files = list_images(&dir)?;
        if files.is_empty() {
            return Err(anyhow!("no JPEG or PNG images in {}", dir.display()));
        }
        log::info!(
            "ImageDirSource: opened {} ({} images)",
            dir.display(),
            files.len()
        );
        Ok(Self {
            dir,
            files,
            next: 0,
            width,
            height,
            released: false,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read image directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl CaptureDevice for ImageDirSource {
    fn describe(&self) -> String {
        format!("{} ({} images)", self.dir.display(), self.files.len())
    }

    fn read(&mut self) -> Result<Frame> {
        if self.released {
            return Err(anyhow!("{} has been released", self.dir.display()));
        }
        let path = self
            .files
            .get(self.next)
            .ok_or_else(|| anyhow!("{}: end of image sequence", self.dir.display()))?;
        let image = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgb8();
        self.next += 1;
        let image = if self.width > 0
            && self.height > 0
            && (image.width() != self.width || image.height() != self.height)
        {
            imageops::resize(&image, self.width, self.height, FilterType::Triangle)
        } else {
            image
        };
        Ok(Frame::new(image))
    }

    fn release(&mut self) {
        self.released = true;
    }

    fn frames_captured(&self) -> u64 {
        self.next as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn plays_images_in_order_then_ends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        RgbImage::from_pixel(4, 4, Rgb([10, 0, 0])).save(dir.path().join("b.png"))?;
        RgbImage::from_pixel(4, 4, Rgb([200, 0, 0])).save(dir.path().join("a.png"))?;
        std::fs::write(dir.path().join("notes.txt"), "skip me")?;

        let mut source = ImageDirSource::open(dir.path(), 8, 6)?;
        assert_eq!(source.len(), 2);

        let first = source.read()?;
        assert_eq!((first.width(), first.height()), (8, 6));
        assert!(first.image().get_pixel(0, 0).0[0] > 150, "a.png should play first");
        source.read()?;
        assert!(source.read().is_err());
        assert_eq!(source.frames_captured(), 2);
        Ok(())
    }

    #[test]
    fn empty_directory_fails_to_open() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(ImageDirSource::open(dir.path(), 8, 8).is_err());
        Ok(())
    }
}
