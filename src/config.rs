use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::DetectParams;
use crate::overlay::{Palette, DEFAULT_PALETTE};
use crate::snapshot::DEFAULT_JPEG_QUALITY;

const DEFAULT_SOURCE: &str = "0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_DEVICE_FPS: u32 = 30;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_RESOLUTION: u32 = 480;
const DEFAULT_CONF_THRESHOLD: f32 = 0.50;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_TARGET_FPS: f64 = 8.0;
const DEFAULT_SNAPSHOT_DIR: &str = "snapshots";
const DEFAULT_WINDOW_NAME: &str = "Real-Time Object Detection";
const DEFAULT_QUIT_KEY: char = 'q';

const KNOWN_BACKENDS: [&str; 3] = ["stub", "synthetic", "tract"];

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AnnotatorConfigFile {
    capture: Option<CaptureConfigFile>,
    detector: Option<DetectorConfigFile>,
    target_fps: Option<f64>,
    snapshot: Option<SnapshotConfigFile>,
    display: Option<DisplayConfigFile>,
    palette: Option<Vec<[u8; 3]>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureConfigFile {
    source: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    device_fps: Option<u32>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    resolution: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SnapshotConfigFile {
    dir: Option<PathBuf>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DisplayConfigFile {
    window_name: Option<String>,
    quit_key: Option<char>,
    headless: Option<bool>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatorConfig {
    pub capture: CaptureSettings,
    pub detector: DetectorSettings,
    /// Ceiling on loop iterations per second.
    pub target_fps: f64,
    pub snapshot: SnapshotSettings,
    pub display: DisplaySettings,
    pub palette: Vec<[u8; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// `stub://name`, an image directory, a device index or a device path.
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// Frame rate requested from hardware devices.
    pub device_fps: u32,
    /// Synthetic sources end the stream after this many frames.
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub resolution: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSettings {
    pub dir: PathBuf,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub window_name: String,
    pub quit_key: char,
    /// Skip the window even when a windowing backend is compiled in.
    pub headless: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            device_fps: DEFAULT_DEVICE_FPS,
            max_frames: None,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model_path: None,
            labels_path: None,
            resolution: DEFAULT_RESOLUTION,
            confidence_threshold: DEFAULT_CONF_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            seed: None,
        }
    }
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            window_name: DEFAULT_WINDOW_NAME.to_string(),
            quit_key: DEFAULT_QUIT_KEY,
            headless: false,
        }
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            capture: CaptureSettings::default(),
            detector: DetectorSettings::default(),
            target_fps: DEFAULT_TARGET_FPS,
            snapshot: SnapshotSettings::default(),
            display: DisplaySettings::default(),
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl AnnotatorConfig {
    /// Defaults, then the file named by `ANNOTATOR_CONFIG`, then environment
    /// overrides, then validation.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like `load`, but an explicit `path` takes precedence over
    /// `ANNOTATOR_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("ANNOTATOR_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let config_path = path.map(Path::to_path_buf).or(env_path);
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(path)?,
            None => AnnotatorConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AnnotatorConfigFile) -> Self {
        let defaults = Self::default();
        let capture = file.capture.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let snapshot = file.snapshot.unwrap_or_default();
        let display = file.display.unwrap_or_default();
        Self {
            capture: CaptureSettings {
                source: capture.source.unwrap_or(defaults.capture.source),
                width: capture.width.unwrap_or(defaults.capture.width),
                height: capture.height.unwrap_or(defaults.capture.height),
                device_fps: capture.device_fps.unwrap_or(defaults.capture.device_fps),
                max_frames: capture.max_frames,
            },
            detector: DetectorSettings {
                backend: detector.backend.unwrap_or(defaults.detector.backend),
                model_path: detector.model_path,
                labels_path: detector.labels_path,
                resolution: detector.resolution.unwrap_or(defaults.detector.resolution),
                confidence_threshold: detector
                    .confidence_threshold
                    .unwrap_or(defaults.detector.confidence_threshold),
                iou_threshold: detector
                    .iou_threshold
                    .unwrap_or(defaults.detector.iou_threshold),
                seed: detector.seed,
            },
            target_fps: file.target_fps.unwrap_or(defaults.target_fps),
            snapshot: SnapshotSettings {
                dir: snapshot.dir.unwrap_or(defaults.snapshot.dir),
                jpeg_quality: snapshot
                    .jpeg_quality
                    .unwrap_or(defaults.snapshot.jpeg_quality),
            },
            display: DisplaySettings {
                window_name: display.window_name.unwrap_or(defaults.display.window_name),
                quit_key: display.quit_key.unwrap_or(defaults.display.quit_key),
                headless: display.headless.unwrap_or(defaults.display.headless),
            },
            palette: file.palette.unwrap_or(defaults.palette),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(source) = non_empty_env("ANNOTATOR_SOURCE") {
            self.capture.source = source;
        }
        if let Some(backend) = non_empty_env("ANNOTATOR_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(model) = non_empty_env("ANNOTATOR_MODEL") {
            self.detector.model_path = Some(PathBuf::from(model));
        }
        if let Some(dir) = non_empty_env("ANNOTATOR_SNAPSHOT_DIR") {
            self.snapshot.dir = PathBuf::from(dir);
        }
        if let Some(fps) = non_empty_env("ANNOTATOR_TARGET_FPS") {
            self.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("ANNOTATOR_TARGET_FPS must be a number, got {}", fps))?;
        }
        if let Some(conf) = non_empty_env("ANNOTATOR_CONF_THRESHOLD") {
            self.detector.confidence_threshold = conf
                .parse()
                .map_err(|_| anyhow!("ANNOTATOR_CONF_THRESHOLD must be a number, got {}", conf))?;
        }
        if let Some(iou) = non_empty_env("ANNOTATOR_IOU_THRESHOLD") {
            self.detector.iou_threshold = iou
                .parse()
                .map_err(|_| anyhow!("ANNOTATOR_IOU_THRESHOLD must be a number, got {}", iou))?;
        }
        Ok(())
    }

    /// Check value ranges. Called by `load`; call again after applying CLI
    /// overrides.
    pub fn validate(&self) -> Result<()> {
        if self.capture.source.trim().is_empty() {
            return Err(anyhow!("capture source must not be empty"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture width and height must be greater than zero"));
        }
        if !self.target_fps.is_finite() || self.target_fps <= 0.0 {
            return Err(anyhow!(
                "target_fps must be greater than zero, got {}",
                self.target_fps
            ));
        }
        if self.detector.resolution == 0 {
            return Err(anyhow!("detector resolution must be greater than zero"));
        }
        check_unit_interval("confidence_threshold", self.detector.confidence_threshold)?;
        check_unit_interval("iou_threshold", self.detector.iou_threshold)?;
        if !KNOWN_BACKENDS.contains(&self.detector.backend.as_str()) {
            return Err(anyhow!(
                "unknown detector backend '{}' (expected one of {})",
                self.detector.backend,
                KNOWN_BACKENDS.join(", ")
            ));
        }
        if self.detector.backend == "tract" && self.detector.model_path.is_none() {
            return Err(anyhow!("the tract backend requires detector.model_path"));
        }
        if self.snapshot.jpeg_quality == 0 || self.snapshot.jpeg_quality > 100 {
            return Err(anyhow!(
                "snapshot jpeg_quality must be within 1..=100, got {}",
                self.snapshot.jpeg_quality
            ));
        }
        if self.palette.is_empty() {
            return Err(anyhow!("palette must contain at least one color"));
        }
        Ok(())
    }

    pub fn detect_params(&self) -> DetectParams {
        DetectParams {
            resolution: self.detector.resolution,
            confidence_threshold: self.detector.confidence_threshold,
            iou_threshold: self.detector.iou_threshold,
        }
    }

    pub fn palette(&self) -> Result<Palette> {
        Palette::new(self.palette.clone())
    }
}

fn check_unit_interval(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<AnnotatorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
