//! Configuration persistence utilities
//!
//! Loads and saves user preferences (not calorie state, which lives in the
//! shared [`crate::storage`] record) as TOML files in the config directory.

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::warn;

use chrono_tz::Tz;

use crate::time_engine::{parse_timezone, Clock, SystemClock, ZonedClock};
use crate::widget::WIDGET_REFRESH_MINUTES;

/// File name (without extension) of the shared preferences
pub const PREFERENCES_NAME: &str = "preferences";

/// Error type for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("could not determine config directory")]
    NoConfigDir,
    /// IO error while reading/writing config
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse config file
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Preferences shared by the wheel app and the home widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelPreferences {
    /// IANA zone that defines "local time" for the 03:00 boundary; the
    /// system zone when unset
    pub timezone: Option<String>,
    /// Keep feedback flashes on the rim instead of letting them spread
    pub reduced_motion: bool,
    /// Flash the rim on notch ticks
    pub feedback_flash: bool,
    /// How often the widget re-reads the state file
    pub widget_refresh_minutes: u64,
}

impl Default for WheelPreferences {
    fn default() -> Self {
        Self {
            timezone: None,
            reduced_motion: false,
            feedback_flash: true,
            widget_refresh_minutes: WIDGET_REFRESH_MINUTES,
        }
    }
}

impl WheelPreferences {
    /// Load the preferences, falling back to defaults on any problem
    pub fn load_or_default() -> Self {
        match load_config(PREFERENCES_NAME) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "failed to load preferences, using defaults");
                Self::default()
            }
        }
    }

    /// The pinned zone, or `None` for the system zone (also when the
    /// configured name doesn't parse)
    pub fn zone(&self) -> Option<Tz> {
        match self.timezone.as_deref().map(parse_timezone) {
            Some(Ok(tz)) => Some(tz),
            Some(Err(e)) => {
                warn!(error = %e, "ignoring configured timezone");
                None
            }
            None => None,
        }
    }

    /// The clock the day boundary is measured in
    pub fn clock(&self) -> Box<dyn Clock> {
        match self.zone() {
            Some(tz) => Box::new(ZonedClock(tz)),
            None => Box::new(SystemClock),
        }
    }
}

/// Get the base configuration directory
fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "caloriewheel", "calorie-wheel")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the configuration file path for a named config
pub fn config_path(name: &str) -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(format!("{}.toml", name)))
}

/// Load a named configuration
///
/// Returns `None` if the config file doesn't exist yet.
/// Returns an error if the file exists but can't be parsed.
pub fn load_config<T: DeserializeOwned>(name: &str) -> Result<Option<T>, ConfigError> {
    let path = config_path(name).ok_or(ConfigError::NoConfigDir)?;

    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)?;
    let config: T = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Save a named configuration
pub fn save_config<T: Serialize>(name: &str, config: &T) -> Result<(), ConfigError> {
    let path = config_path(name).ok_or(ConfigError::NoConfigDir)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(&path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path() {
        let path = config_path("preferences_test");
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("preferences_test.toml"));
    }

    #[test]
    fn test_partial_preferences_fill_defaults() {
        let prefs: WheelPreferences = toml::from_str("reduced_motion = true").unwrap();
        assert!(prefs.reduced_motion);
        assert!(prefs.feedback_flash);
        assert_eq!(prefs.widget_refresh_minutes, WIDGET_REFRESH_MINUTES);
        assert_eq!(prefs.timezone, None);
    }

    #[test]
    fn test_preferences_round_trip() {
        let prefs = WheelPreferences {
            timezone: Some("Europe/Berlin".to_string()),
            reduced_motion: true,
            feedback_flash: false,
            widget_refresh_minutes: 15,
        };
        let text = toml::to_string_pretty(&prefs).unwrap();
        let back: WheelPreferences = toml::from_str(&text).unwrap();
        assert_eq!(back, prefs);
    }

    #[test]
    fn test_bad_timezone_uses_system_zone() {
        let prefs = WheelPreferences {
            timezone: Some("Nowhere/Special".to_string()),
            ..WheelPreferences::default()
        };
        assert_eq!(prefs.zone(), None);

        let pinned = WheelPreferences {
            timezone: Some("UTC".to_string()),
            ..WheelPreferences::default()
        };
        assert_eq!(pinned.zone(), Some(chrono_tz::UTC));
        assert_eq!(WheelPreferences::default().zone(), None);
    }
}
