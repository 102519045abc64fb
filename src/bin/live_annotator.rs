//! live_annotator - annotate a live camera feed with object detections
//!
//! This binary:
//! 1. Resolves configuration (file, environment, flags)
//! 2. Opens the capture device (failure is fatal)
//! 3. Opens the display window (headless when disabled or not compiled in)
//! 4. Runs the frame loop until end of stream, the quit key or Ctrl-C
//! 5. Prints the per-class session summary

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use live_annotator::{
    detect, open_capture, open_display, AnnotatorConfig, FrameLoop, LoopSettings, Overlay,
    RateLimiter, SnapshotWriter,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON or TOML config file.
    #[arg(long, env = "ANNOTATOR_CONFIG")]
    config: Option<PathBuf>,
    /// Capture source: `stub://name`, image directory, device index or path.
    #[arg(long)]
    source: Option<String>,
    /// Detector backend: stub, synthetic or tract.
    #[arg(long)]
    backend: Option<String>,
    /// ONNX model file for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Class names, one per line (defaults to COCO-80).
    #[arg(long)]
    labels: Option<PathBuf>,
    /// Maximum frames processed per second.
    #[arg(long)]
    fps: Option<f64>,
    /// Square inference resolution in pixels.
    #[arg(long)]
    imgsz: Option<u32>,
    /// Detection confidence threshold.
    #[arg(long)]
    conf: Option<f32>,
    /// NMS IoU threshold.
    #[arg(long)]
    iou: Option<f32>,
    /// Directory for snapshots of frames with detections.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
    /// Stop synthetic sources after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Seed for the synthetic detector.
    #[arg(long)]
    seed: Option<u64>,
    /// Run without a window; Ctrl-C stops the loop.
    #[arg(long)]
    headless: bool,
}

impl Args {
    fn apply(self, cfg: &mut AnnotatorConfig) {
        if let Some(source) = self.source {
            cfg.capture.source = source;
        }
        if let Some(max_frames) = self.max_frames {
            cfg.capture.max_frames = Some(max_frames);
        }
        if let Some(backend) = self.backend {
            cfg.detector.backend = backend;
        }
        if let Some(model) = self.model {
            cfg.detector.model_path = Some(model);
        }
        if let Some(labels) = self.labels {
            cfg.detector.labels_path = Some(labels);
        }
        if let Some(imgsz) = self.imgsz {
            cfg.detector.resolution = imgsz;
        }
        if let Some(conf) = self.conf {
            cfg.detector.confidence_threshold = conf;
        }
        if let Some(iou) = self.iou {
            cfg.detector.iou_threshold = iou;
        }
        if let Some(seed) = self.seed {
            cfg.detector.seed = Some(seed);
        }
        if let Some(fps) = self.fps {
            cfg.target_fps = fps;
        }
        if let Some(dir) = self.snapshot_dir {
            cfg.snapshot.dir = dir;
        }
        if self.headless {
            cfg.display.headless = true;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = AnnotatorConfig::load_from(args.config.as_deref())?;
    args.apply(&mut cfg);
    cfg.validate()?;

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = interrupt.clone();
        ctrlc::set_handler(move || interrupt.store(true, Ordering::SeqCst))
            .map_err(|e| anyhow!("failed to install Ctrl-C handler: {}", e))?;
    }

    let snapshots = SnapshotWriter::new(&cfg.snapshot.dir, cfg.snapshot.jpeg_quality)?;
    snapshots.ensure_dir()?;
    let overlay = Overlay::new(cfg.palette()?)?;
    let rate = RateLimiter::new(cfg.target_fps)?;
    let detector = detect::create_backend(&cfg.detector)?;

    let capture = open_capture(&cfg.capture)
        .with_context(|| format!("cannot open capture source {}", cfg.capture.source))?;
    let display = open_display(&cfg.display, interrupt)?;

    log::info!(
        "starting inference loop. press '{}' or Ctrl-C to exit. snapshots -> {}",
        cfg.display.quit_key,
        snapshots.dir().display()
    );
    let mut frame_loop = FrameLoop::new(
        capture,
        detector,
        display,
        snapshots,
        overlay,
        rate,
        LoopSettings::from_config(&cfg),
    );
    if let Err(err) = frame_loop.warm_up() {
        log::warn!("detector warm-up failed: {:#}", err);
    }

    let report = frame_loop.run();
    print!("{}", report);
    Ok(())
}
