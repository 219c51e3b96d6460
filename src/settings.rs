// src/settings.rs
//
// Operator settings: which interface and motor to talk to, display gearing,
// reader timing and the connect retry policy. Stored as TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::MotorId;
use crate::link::DEFAULT_READ_TIMEOUT;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_interface")]
    pub interface: String,
    #[serde(default = "default_motor_id")]
    pub motor_id: MotorId,
    /// Output-shaft reduction; motor degrees = output degrees * gear_ratio
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f32,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Total connect attempts (>= 1)
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_interface() -> String {
    "can0".to_string()
}
fn default_motor_id() -> MotorId {
    MotorId::new(1)
}
fn default_gear_ratio() -> f32 {
    1.0
}
fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT.as_millis() as u64
}
fn default_poll_interval_ms() -> u64 {
    50
}
fn default_connect_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            motor_id: default_motor_id(),
            gear_ratio: default_gear_ratio(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            connect_retries: default_connect_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            log_dir: None,
        }
    }
}

impl Settings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Reject values the link or display cannot use.
    pub fn validate(&self) -> Result<(), String> {
        if self.interface.trim().is_empty() {
            return Err("interface must not be empty".to_string());
        }
        if !(self.gear_ratio.is_finite() && self.gear_ratio > 0.0) {
            return Err(format!(
                "gear_ratio must be a positive number, got {}",
                self.gear_ratio
            ));
        }
        if self.connect_retries == 0 {
            return Err("connect_retries must be at least 1".to_string());
        }
        Ok(())
    }

    /// Motor-side degrees to output-shaft degrees, for display.
    pub fn to_output(&self, motor_value: f32) -> f32 {
        motor_value / self.gear_ratio
    }

    /// Output-shaft target to motor-side degrees, for commands.
    pub fn to_motor(&self, output_value: f32) -> f32 {
        output_value * self.gear_ratio
    }
}

/// `$XDG_CONFIG_HOME/akservo/settings.toml` or the platform equivalent.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("akservo").join("settings.toml"))
}

/// Load settings from `path`, or from the default path when `None`.
/// A missing file yields defaults; a malformed one is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, String> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_settings_path() {
            Some(p) => p,
            None => return Ok(Settings::default()),
        },
    };

    if !path.exists() {
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let settings: Settings = toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    settings.validate()?;
    Ok(settings)
}

/// Write settings as TOML, creating parent directories.
pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), String> {
    settings.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    let contents = toml::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialise settings: {}", e))?;
    std::fs::write(path, contents).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

/// Parse a motor address written as decimal (`12`) or hex (`0x0C`).
pub fn parse_motor_id(text: &str) -> Result<MotorId, String> {
    let text = text.trim();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => text.parse::<u8>(),
    };
    parsed
        .map(MotorId::new)
        .map_err(|_| format!("invalid motor id '{}' (expected 0-255 or 0x00-0xFF)", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("akservo-settings-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = load_settings(Some(&scratch_path("absent.toml"))).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.read_timeout(), DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = scratch_path("partial.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "interface = \"vcan0\"\nmotor_id = 41\ngear_ratio = 6.0\n").unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.interface, "vcan0");
        assert_eq!(settings.motor_id, MotorId::new(41));
        assert_eq!(settings.gear_ratio, 6.0);
        assert_eq!(settings.connect_retries, 3);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch_path("saved/settings.toml");
        let settings = Settings {
            interface: "can1".to_string(),
            motor_id: MotorId::new(0x7F),
            gear_ratio: 9.0,
            log_dir: Some(PathBuf::from("/tmp/akservo-logs")),
            ..Settings::default()
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(Some(&path)).unwrap(), settings);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_gear_ratio_rejected() {
        let path = scratch_path("bad_gear.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "gear_ratio = -2.0\n").unwrap();

        let err = load_settings(Some(&path)).unwrap_err();
        assert!(err.contains("gear_ratio"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_gear_conversion() {
        let settings = Settings {
            gear_ratio: 6.0,
            ..Settings::default()
        };
        assert_eq!(settings.to_output(360.0), 60.0);
        assert_eq!(settings.to_motor(15.0), 90.0);
    }

    #[test]
    fn test_parse_motor_id() {
        assert_eq!(parse_motor_id("12"), Ok(MotorId::new(12)));
        assert_eq!(parse_motor_id("0x1F"), Ok(MotorId::new(0x1F)));
        assert_eq!(parse_motor_id("0XfF"), Ok(MotorId::new(0xFF)));
        assert!(parse_motor_id("256").is_err());
        assert!(parse_motor_id("0xZZ").is_err());
    }
}
