//! Application configuration.
//!
//! The configuration file is a flat JSON object whose keys mirror the
//! filter parameters one to one. It is read once at startup; a missing or
//! malformed file is fatal, there is no silent fallback to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SteadyError, SteadyResult};

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Speed (px/s) at or below which the EMA uses `alpha_min`.
    pub v_min: f64,
    /// Speed (px/s) at or above which the EMA uses `alpha_max`.
    pub v_max: f64,
    /// Smoothing gain for slow motion (smaller = heavier smoothing).
    pub alpha_min: f64,
    /// Smoothing gain for fast motion.
    pub alpha_max: f64,

    /// Motion shorter than this (px) is jitter when also slower than `jitter_speed_max`.
    pub jitter_deadzone_px: f64,
    /// Speed (px/s) under which short motion is treated as jitter.
    pub jitter_speed_max: f64,
    /// Fraction of alpha removed for very slow motion, in `[0, 1]`.
    pub extra_damp_factor: f64,

    /// Seconds between latency summaries.
    pub profiler_log_interval_sec: f64,

    /// Tag stamped on synthetic events so the hook can recognize them.
    pub magic_number: u64,

    /// Whether smoothing is active right after startup.
    #[serde(default = "default_true")]
    pub enabled_on_start: bool,

    /// Function key toggling smoothing (e.g. "F10").
    pub hotkey_toggle: String,
    /// Function key quitting the application (e.g. "F12").
    pub hotkey_quit: String,

    /// Process names that pause smoothing while in the foreground.
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Seconds between foreground process checks.
    #[serde(default = "default_blacklist_poll")]
    pub blacklist_poll_interval_sec: f64,

    /// Run the guided calibration before entering the main loop.
    #[serde(default)]
    pub run_calibration_on_start: bool,

    /// Duration of the slow calibration phase.
    #[serde(default = "default_phase_secs")]
    pub calibration_slow_duration_sec: f64,
    /// Duration of the fast calibration phase.
    #[serde(default = "default_phase_secs")]
    pub calibration_fast_duration_sec: f64,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "steadyhand=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

fn default_true() -> bool {
    true
}

fn default_blacklist_poll() -> f64 {
    0.5
}

fn default_phase_secs() -> f64 {
    5.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            v_min: 40.0,
            v_max: 900.0,
            alpha_min: 0.15,
            alpha_max: 0.85,
            jitter_deadzone_px: 1.5,
            jitter_speed_max: 60.0,
            extra_damp_factor: 0.3,
            profiler_log_interval_sec: 5.0,
            magic_number: 0x5354_4459,
            enabled_on_start: true,
            hotkey_toggle: "F10".to_string(),
            hotkey_quit: "F12".to_string(),
            blacklist: Vec::new(),
            blacklist_poll_interval_sec: default_blacklist_poll(),
            run_calibration_on_start: false,
            calibration_slow_duration_sec: default_phase_secs(),
            calibration_fast_duration_sec: default_phase_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load and validate config from `path`.
    pub fn load_from(path: &Path) -> SteadyResult<Self> {
        if !path.exists() {
            return Err(SteadyError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            SteadyError::config(format!("malformed config at {}: {e}", path.display()))
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> SteadyResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check every value the engine relies on.
    pub fn validate(&self) -> SteadyResult<()> {
        let finite = [
            ("v_min", self.v_min),
            ("v_max", self.v_max),
            ("alpha_min", self.alpha_min),
            ("alpha_max", self.alpha_max),
            ("jitter_deadzone_px", self.jitter_deadzone_px),
            ("jitter_speed_max", self.jitter_speed_max),
            ("extra_damp_factor", self.extra_damp_factor),
            ("profiler_log_interval_sec", self.profiler_log_interval_sec),
            ("blacklist_poll_interval_sec", self.blacklist_poll_interval_sec),
            ("calibration_slow_duration_sec", self.calibration_slow_duration_sec),
            ("calibration_fast_duration_sec", self.calibration_fast_duration_sec),
        ];
        if let Some((key, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SteadyError::config(format!("{key} must be a finite number")));
        }

        for (key, value) in [("alpha_min", self.alpha_min), ("alpha_max", self.alpha_max)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SteadyError::config(format!(
                    "{key} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.alpha_min > self.alpha_max {
            return Err(SteadyError::config(format!(
                "alpha_min ({}) exceeds alpha_max ({})",
                self.alpha_min, self.alpha_max
            )));
        }
        if self.v_min < 0.0 || self.v_max < 0.0 {
            return Err(SteadyError::config("v_min and v_max must be non-negative"));
        }
        if self.jitter_deadzone_px < 0.0 || self.jitter_speed_max < 0.0 {
            return Err(SteadyError::config(
                "jitter_deadzone_px and jitter_speed_max must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.extra_damp_factor) {
            return Err(SteadyError::config(format!(
                "extra_damp_factor must be within [0, 1], got {}",
                self.extra_damp_factor
            )));
        }
        for (key, value) in [
            ("profiler_log_interval_sec", self.profiler_log_interval_sec),
            ("blacklist_poll_interval_sec", self.blacklist_poll_interval_sec),
            ("calibration_slow_duration_sec", self.calibration_slow_duration_sec),
            ("calibration_fast_duration_sec", self.calibration_fast_duration_sec),
        ] {
            if value <= 0.0 {
                return Err(SteadyError::config(format!("{key} must be positive")));
            }
        }

        if self.magic_number == 0 {
            return Err(SteadyError::config(
                "magic_number must be non-zero; real input carries a zero tag",
            ));
        }
        if usize::try_from(self.magic_number).is_err() {
            return Err(SteadyError::config(
                "magic_number does not fit the platform pointer width",
            ));
        }

        for (key, name) in [
            ("hotkey_toggle", &self.hotkey_toggle),
            ("hotkey_quit", &self.hotkey_quit),
        ] {
            if function_key_number(name).is_none() {
                return Err(SteadyError::config(format!(
                    "{key} '{name}' is not a supported key (F1-F24)"
                )));
            }
        }
        if function_key_number(&self.hotkey_toggle) == function_key_number(&self.hotkey_quit) {
            return Err(SteadyError::config(
                "hotkey_toggle and hotkey_quit must be different keys",
            ));
        }

        Ok(())
    }

    /// The magic number as the pointer-sized tag carried by synthetic events.
    ///
    /// Validation guarantees the conversion succeeds for loaded configs.
    pub fn magic_tag(&self) -> usize {
        usize::try_from(self.magic_number).unwrap_or(usize::MAX)
    }
}

/// Parse a function key name ("F1".."F24", case-insensitive) into its number.
pub fn function_key_number(name: &str) -> Option<u8> {
    let trimmed = name.trim();
    let digits = trimmed
        .strip_prefix('F')
        .or_else(|| trimmed.strip_prefix('f'))?;
    let number: u8 = digits.parse().ok()?;
    (1..=24).contains(&number).then_some(number)
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .or_else(|_| std::env::var("APPDATA"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("steadyhand").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("steadyhand_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn test_save_then_load() {
        let dir = scratch_dir("config_save");
        let path = dir.join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.blacklist = vec!["game.exe".to_string()];
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = scratch_dir("config_missing");
        let err = AppConfig::load_from(&dir.join("absent.json")).unwrap_err();
        assert!(matches!(err, SteadyError::FileNotFound { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let dir = scratch_dir("config_malformed");
        let path = dir.join("config.json");
        std::fs::write(&path, "{ \"v_min\": 10.0, ").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, SteadyError::Config { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_required_key_is_fatal() {
        let dir = scratch_dir("config_missing_key");
        let path = dir.join("config.json");
        let mut value = serde_json::to_value(AppConfig::default()).unwrap();
        value.as_object_mut().unwrap().remove("magic_number");
        std::fs::write(&path, value.to_string()).unwrap();
        assert!(AppConfig::load_from(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_optional_keys_take_defaults() {
        let mut value = serde_json::to_value(AppConfig::default()).unwrap();
        let map = value.as_object_mut().unwrap();
        for key in [
            "enabled_on_start",
            "blacklist",
            "blacklist_poll_interval_sec",
            "run_calibration_on_start",
            "calibration_slow_duration_sec",
            "calibration_fast_duration_sec",
            "logging",
        ] {
            map.remove(key);
        }
        let config: AppConfig = serde_json::from_value(value).unwrap();
        assert!(config.enabled_on_start);
        assert!(config.blacklist.is_empty());
        assert_eq!(config.blacklist_poll_interval_sec, 0.5);
        assert_eq!(config.calibration_slow_duration_sec, 5.0);
    }

    #[test]
    fn test_rejects_inverted_alpha_range() {
        let config = AppConfig {
            alpha_min: 0.9,
            alpha_max: 0.2,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_degenerate_speed_range_is_allowed() {
        let config = AppConfig {
            v_min: 300.0,
            v_max: 100.0,
            ..AppConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_hotkeys() {
        let unknown = AppConfig {
            hotkey_toggle: "PrintScreen".to_string(),
            ..AppConfig::default()
        };
        assert!(unknown.validate().is_err());

        let same = AppConfig {
            hotkey_toggle: "f12".to_string(),
            hotkey_quit: "F12".to_string(),
            ..AppConfig::default()
        };
        assert!(same.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_magic() {
        let config = AppConfig {
            magic_number: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_function_key_number() {
        assert_eq!(function_key_number("F10"), Some(10));
        assert_eq!(function_key_number("f1"), Some(1));
        assert_eq!(function_key_number("F24"), Some(24));
        assert_eq!(function_key_number("F0"), None);
        assert_eq!(function_key_number("F25"), None);
        assert_eq!(function_key_number("Escape"), None);
    }
}
