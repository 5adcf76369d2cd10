// Runtime settings
// Loaded from ~/.config/accord/settings.json

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Log verbosity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `-v` flags raise the level one step each.
    pub fn raised_by(self, steps: u8) -> Self {
        const ORDER: [LogLevel; 6] = [
            LogLevel::Off,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let index = ORDER.iter().position(|l| *l == self).unwrap_or(2);
        ORDER[(index + steps as usize).min(ORDER.len() - 1)]
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "settings IO error: {e}"),
            Self::Parse(e) => write!(f, "settings parse error: {e}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Collection
    #[serde(rename = "collect.timeoutSeconds")]
    pub collect_timeout_seconds: Option<u64>, // None = wait forever

    #[serde(rename = "collect.parallel")]
    pub collect_parallel: bool,

    // Delivery
    #[serde(rename = "delivery.enabled")]
    pub delivery_enabled: bool,

    #[serde(rename = "delivery.timeoutSeconds")]
    pub delivery_timeout_seconds: Option<u64>, // None = same as collection

    // Logging
    #[serde(rename = "log.level")]
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collect_timeout_seconds: Some(30),
            collect_parallel: true,
            delivery_enabled: true,
            delivery_timeout_seconds: None,
            log_level: LogLevel::Warn,
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Collection: per-participant fetch timeout (null or 0 = no timeout)
    "collect.timeoutSeconds": 30,
    "collect.parallel": true,

    // Delivery: hand combined records back to participants
    "delivery.enabled": true,
    // null = use collect.timeoutSeconds
    "delivery.timeoutSeconds": null,

    // Logging: "off", "error", "warn", "info", "debug", "trace"
    "log.level": "warn"
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("accord")
            .join("settings.json")
    }

    /// Load settings from the default path, falling back to defaults.
    /// A missing file is created with commented defaults. The error that
    /// forced the fallback is returned alongside so the caller can report
    /// it once logging is up.
    pub fn load() -> (Self, Option<SettingsError>) {
        let path = Self::config_path();
        if !path.exists() {
            let error = Self::create_default_file(&path).err();
            return (Self::default(), error);
        }
        match Self::load_from(&path) {
            Ok(settings) => (settings, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Strict load. Lines starting with `//` are comments.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, SettingsError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(serde_json::from_str(&cleaned)?)
    }

    fn create_default_file(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_FILE)?;
        Ok(())
    }

    /// `null` and `0` both mean no timeout.
    pub fn collect_timeout(&self) -> Option<Duration> {
        self.collect_timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn delivery_timeout(&self) -> Option<Duration> {
        match self.delivery_timeout_seconds {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => self.collect_timeout(),
        }
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_parses_to_defaults() {
        assert_eq!(Settings::from_json(DEFAULT_FILE).unwrap(), Settings::default());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let settings = Settings::from_json(r#"{ "log.level": "debug" }"#).unwrap();
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert!(settings.collect_parallel);
        assert_eq!(settings.collect_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn null_timeout_disables_it() {
        let settings = Settings::from_json(r#"{ "collect.timeoutSeconds": null }"#).unwrap();
        assert_eq!(settings.collect_timeout(), None);
        assert_eq!(settings.delivery_timeout(), None);
    }

    #[test]
    fn delivery_timeout_falls_back_to_collect() {
        let mut settings = Settings::default();
        assert_eq!(settings.delivery_timeout(), Some(Duration::from_secs(30)));
        settings.delivery_timeout_seconds = Some(5);
        assert_eq!(settings.delivery_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(matches!(
            Settings::from_json(r#"{ "log.level": "loud" }"#),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let settings = Settings::from_json(r#"{ "collect.timeoutSeconds": 0 }"#).unwrap();
        assert_eq!(settings.collect_timeout(), None);
        assert_eq!(settings.delivery_timeout(), None);

        let settings = Settings::from_json(r#"{ "delivery.timeoutSeconds": 0 }"#).unwrap();
        assert_eq!(settings.collect_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(settings.delivery_timeout(), None);
    }

    #[test]
    fn load_from_reads_comments_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            "{\n    // sequential\n    \"collect.parallel\": false,\n    \"delivery.enabled\": false\n}\n",
        )
        .unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert!(!settings.collect_parallel);
        assert!(!settings.delivery_enabled);
        assert_eq!(settings.log_level, LogLevel::Warn);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Settings::load_from(&dir.path().join("absent.json")),
            Err(SettingsError::Io(_))
        ));
    }

    #[test]
    fn verbosity_steps() {
        assert_eq!(LogLevel::Warn.raised_by(0), LogLevel::Warn);
        assert_eq!(LogLevel::Warn.raised_by(1), LogLevel::Info);
        assert_eq!(LogLevel::Warn.raised_by(9), LogLevel::Trace);
        assert_eq!(LogLevel::Off.raised_by(1), LogLevel::Error);
    }
}
