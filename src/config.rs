//! Configuration management for the face and eye detection pipeline

use crate::{
    constants::{
        DEFAULT_FACE_RECT_THICKNESS, DEFAULT_MATCH_IOU, DEFAULT_MAX_MISSED_SCANS, DEFAULT_REGION_TIMEOUT_MS,
        DEFAULT_RELATIVE_FACE_SIZE, DEFAULT_SCAN_INTERVAL_MS,
    },
    session::Mode,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Classifier file paths
    pub cascades: CascadeConfig,

    /// Detection parameters
    pub detection: DetectionConfig,

    /// Background tracker configuration
    pub tracker: TrackerConfig,

    /// Overlay drawing configuration
    pub overlay: OverlayConfig,
}

/// Cascade classifier file paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Path to the frontal face classifier
    pub face: PathBuf,

    /// Path to the eye classifier
    pub eye: PathBuf,
}

/// Detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum face size as a fraction of frame height (0.0-1.0)
    pub relative_face_size: f32,

    /// Detection mode at session start
    pub mode: Mode,
}

/// Background tracker parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Interval between background scans in milliseconds
    pub scan_interval_ms: u64,

    /// Scans a tracked object survives without a matching detection
    pub max_missed_scans: u32,

    /// Overlap required to continue a tracked object or region (0.0-1.0)
    pub match_iou: f64,

    /// Milliseconds a region's objects are kept after its last submission
    pub region_timeout_ms: u64,
}

/// Overlay drawing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Draw face rectangles and eye overlays
    pub enabled: bool,

    /// Face rectangle thickness in pixels
    pub face_rect_thickness: u32,

    /// Seed for the pupil generator, entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            face: PathBuf::from("assets/lbpcascade_frontalface.xml"),
            eye: PathBuf::from("assets/haarcascade_eye.xml"),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            relative_face_size: DEFAULT_RELATIVE_FACE_SIZE,
            mode: Mode::Cascade,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            max_missed_scans: DEFAULT_MAX_MISSED_SCANS,
            match_iou: DEFAULT_MATCH_IOU,
            region_timeout_ms: DEFAULT_REGION_TIMEOUT_MS,
        }
    }
}

impl TrackerConfig {
    /// Scan interval as a duration
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Region timeout as a duration
    #[must_use]
    pub fn region_timeout(&self) -> Duration {
        Duration::from_millis(self.region_timeout_ms)
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            face_rect_thickness: DEFAULT_FACE_RECT_THICKNESS,
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration cannot be serialized or written.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration.
    ///
    /// Missing classifier files are not an error here: the session treats
    /// them as not-ready slots.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let fraction = self.detection.relative_face_size;
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(Error::ConfigError(
                "Relative face size must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.tracker.scan_interval_ms == 0 {
            return Err(Error::ConfigError(
                "Tracker scan interval must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.tracker.match_iou) {
            return Err(Error::ConfigError(
                "Tracker match IoU must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.tracker.region_timeout_ms == 0 {
            return Err(Error::ConfigError(
                "Tracker region timeout must be greater than 0".to_string(),
            ));
        }

        if self.overlay.face_rect_thickness == 0 {
            return Err(Error::ConfigError(
                "Face rectangle thickness must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face and Eye Detection Configuration

# Classifier paths
cascades:
  face: "assets/lbpcascade_frontalface.xml"
  eye: "assets/haarcascade_eye.xml"

# Detection parameters
detection:
  relative_face_size: 0.2
  mode: cascade

# Background tracker
tracker:
  scan_interval_ms: 100
  max_missed_scans: 2
  match_iou: 0.3
  region_timeout_ms: 1000

# Overlay drawing
overlay:
  enabled: true
  face_rect_thickness: 3
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = serde_yaml::from_str("detection:\n  mode: tracked\n").unwrap();
        assert_eq!(parsed.detection.mode, Mode::Tracked);
        assert!((parsed.detection.relative_face_size - 0.2).abs() < f32::EPSILON);
        assert_eq!(parsed.tracker, TrackerConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.detection.relative_face_size = 1.5;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.tracker.scan_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tracker.match_iou = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tracker.region_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scan_interval() {
        assert_eq!(TrackerConfig::default().scan_interval(), Duration::from_millis(100));
        assert_eq!(TrackerConfig::default().region_timeout(), Duration::from_secs(1));
    }
}
