//! Configuration file round trips and error reporting

use face_eye_detect::{
    config::{Config, EXAMPLE_CONFIG},
    session::Mode,
    Error,
};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("detect.yaml");

    let mut config = Config::default();
    config.cascades.face = PathBuf::from("/opt/cascades/face.xml");
    config.detection.relative_face_size = 0.3;
    config.detection.mode = Mode::Tracked;
    config.tracker.scan_interval_ms = 40;
    config.overlay.seed = Some(7);

    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_example_config_file_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("example.yaml");
    std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.detection.mode, Mode::Cascade);
    assert_eq!(config.overlay.face_rect_thickness, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn test_malformed_config_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "detection:\n  mode: sideways\n").unwrap();

    assert!(matches!(Config::from_file(&path), Err(Error::ConfigError(_))));
}

#[test]
fn test_missing_config_is_io_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Config::from_file(dir.path().join("absent.yaml")),
        Err(Error::Io(_))
    ));
}
