use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use live_annotator::config::AnnotatorConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ANNOTATOR_CONFIG",
        "ANNOTATOR_SOURCE",
        "ANNOTATOR_BACKEND",
        "ANNOTATOR_MODEL",
        "ANNOTATOR_TARGET_FPS",
        "ANNOTATOR_SNAPSHOT_DIR",
        "ANNOTATOR_CONF_THRESHOLD",
        "ANNOTATOR_IOU_THRESHOLD",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "capture": { "source": "stub://porch", "width": 320, "height": 240, "max_frames": 50 },
        "detector": {
            "backend": "synthetic",
            "resolution": 640,
            "confidence_threshold": 0.6,
            "iou_threshold": 0.5,
            "seed": 11
        },
        "target_fps": 5.0,
        "snapshot": { "dir": "out/snaps", "jpeg_quality": 75 },
        "display": { "window_name": "porch", "quit_key": "x", "headless": true },
        "palette": [[1, 2, 3], [4, 5, 6]]
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("ANNOTATOR_CONFIG", file.path());
    std::env::set_var("ANNOTATOR_TARGET_FPS", "12.5");
    std::env::set_var("ANNOTATOR_CONF_THRESHOLD", "0.25");

    let cfg = AnnotatorConfig::load().expect("load config");

    assert_eq!(cfg.capture.source, "stub://porch");
    assert_eq!(cfg.capture.width, 320);
    assert_eq!(cfg.capture.height, 240);
    assert_eq!(cfg.capture.max_frames, Some(50));
    assert_eq!(cfg.detector.backend, "synthetic");
    assert_eq!(cfg.detector.resolution, 640);
    assert_eq!(cfg.detector.confidence_threshold, 0.25);
    assert_eq!(cfg.detector.iou_threshold, 0.5);
    assert_eq!(cfg.detector.seed, Some(11));
    assert_eq!(cfg.target_fps, 12.5);
    assert_eq!(cfg.snapshot.dir, PathBuf::from("out/snaps"));
    assert_eq!(cfg.snapshot.jpeg_quality, 75);
    assert_eq!(cfg.display.window_name, "porch");
    assert_eq!(cfg.display.quit_key, 'x');
    assert!(cfg.display.headless);
    assert_eq!(cfg.palette, vec![[1, 2, 3], [4, 5, 6]]);

    clear_env();
}

#[test]
fn loads_toml_config_from_explicit_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
target_fps = 4.0

[capture]
source = "stub://garage"

[detector]
backend = "stub"
iou_threshold = 0.3
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = AnnotatorConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.capture.source, "stub://garage");
    assert_eq!(cfg.target_fps, 4.0);
    assert_eq!(cfg.detector.iou_threshold, 0.3);
    assert_eq!(cfg.detector.confidence_threshold, 0.5);
    assert_eq!(cfg.capture.width, 640);

    clear_env();
}

#[test]
fn rejects_out_of_range_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ANNOTATOR_TARGET_FPS", "0");
    assert!(AnnotatorConfig::load().is_err());
    clear_env();

    std::env::set_var("ANNOTATOR_IOU_THRESHOLD", "1.5");
    assert!(AnnotatorConfig::load().is_err());
    clear_env();

    std::env::set_var("ANNOTATOR_TARGET_FPS", "fast");
    let err = AnnotatorConfig::load().expect_err("non-numeric fps");
    assert!(err.to_string().contains("ANNOTATOR_TARGET_FPS"));
    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let err = AnnotatorConfig::load_from(Some(std::path::Path::new("/nonexistent/annotator.json")))
        .expect_err("missing file");
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
