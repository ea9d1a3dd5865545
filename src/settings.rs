//! Run settings
//!
//! Read from a JSON file at startup. Missing fields fall back to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_SEGMENT_COUNT;

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Obstacle segments between start and finish
    pub segment_count: u32,
    /// Fixed seed for the first course (restarts always draw a new one)
    pub seed: Option<u64>,
    /// Length of a headless run before giving up (seconds)
    pub demo_seconds: f32,
    /// Headless run steers the marble itself
    pub autopilot: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            segment_count: DEFAULT_SEGMENT_COUNT,
            seed: None,
            demo_seconds: 60.0,
            autopilot: true,
        }
    }
}

impl Settings {
    /// Environment variable naming the settings file
    pub const PATH_ENV: &'static str = "MARBLE_RACE_SETTINGS";
    /// Settings file used when the variable is unset
    pub const DEFAULT_PATH: &'static str = "marble_race.json";

    /// Segment count with the minimum of one applied
    pub fn segment_count(&self) -> u32 {
        if self.segment_count == 0 {
            log::warn!("Settings ask for 0 segments, using 1");
        }
        self.segment_count.max(1)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Settings file location
    pub fn path() -> PathBuf {
        std::env::var_os(Self::PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_PATH))
    }

    /// Load from [`Settings::path`], falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load from `path`, falling back to defaults if it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(_) => {
                log::info!("No settings at {}, using defaults", path.display());
                return Self::default();
            }
        };

        match Self::from_json(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Invalid settings in {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "segment_count": 9 }"#).unwrap();
        assert_eq!(settings.segment_count, 9);
        assert_eq!(settings.seed, None);
        assert!(settings.autopilot);
    }

    #[test]
    fn test_zero_segments_clamped() {
        let settings = Settings::from_json(r#"{ "segment_count": 0, "seed": 17 }"#).unwrap();
        assert_eq!(settings.segment_count(), 1);
        assert_eq!(settings.seed, Some(17));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(Settings::from_json(r#"{ "segment_count": "five" }"#).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = Settings {
            segment_count: 12,
            seed: Some(3),
            demo_seconds: 10.0,
            autopilot: false,
        };
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_defaults() {
        let settings = Settings::load_from(Path::new("/nonexistent/marble_race.json"));
        assert_eq!(settings, Settings::default());
    }
}
