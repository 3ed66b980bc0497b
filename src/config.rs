/// Client configuration.
///
/// Read from a TOML file (`cdews.toml` by default) with every field
/// optional, then overridden from the environment. `.env` is loaded first,
/// so `CDEWS_API_URL` and `CDEWS_LOG_LEVEL` may live there.
///
/// ```toml
/// [api]
/// base_url = "http://localhost:8000"
/// timeout_secs = 30
///
/// [map]
/// center_lat = 20.5937
/// center_long = 78.9629
/// zoom = 5
///
/// [refresh]
/// max_age_minutes = 15
///
/// [logging]
/// level = "info"
/// file = "cdews.log"
/// ```

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::logging::LogLevel;
use crate::map::{self, MapView};
use crate::model::Coordinates;

pub const DEFAULT_CONFIG_PATH: &str = "cdews.toml";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_AGE_MINUTES: u64 = 15;

pub const ENV_API_URL: &str = "CDEWS_API_URL";
pub const ENV_LOG_LEVEL: &str = "CDEWS_LOG_LEVEL";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center_lat: f64,
    pub center_long: f64,
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: map::DEFAULT_CENTER.lat,
            center_long: map::DEFAULT_CENTER.long,
            zoom: map::DEFAULT_ZOOM,
        }
    }
}

impl MapConfig {
    pub fn view(&self) -> MapView {
        MapView::new(Coordinates::new(self.center_lat, self.center_long), self.zoom)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub max_age_minutes: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: DEFAULT_MAX_AGE_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Unrecognized levels fall back to `Info`.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.level).unwrap_or(LogLevel::Info)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub map: MapConfig,
    pub refresh: RefreshConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file. A missing file is an error here; use
    /// `load` for the optional default path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Loads `.env`, then the config file, then applies env overrides.
    ///
    /// With `path = None` the default `cdews.toml` is used if it exists and
    /// built-in defaults otherwise. An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => Config::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `CDEWS_*` overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.logging.level = level.trim().to_string();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api.base_url must start with http:// or https://, got '{}'",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be positive".to_string()));
        }
        if !self.map.view().center.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "map center ({}, {}) is outside WGS84 bounds",
                self.map.center_lat, self.map.center_long
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.map.view(), MapView::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [api]
            base_url = "https://cdews.example.org"

            [map]
            zoom = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://cdews.example.org");
        assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.map.zoom, 8);
        assert_eq!(config.map.center_lat, map::DEFAULT_CENTER.lat);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[refresh]\nmax_age_minutes = 5\n[logging]\nlevel = \"debug\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.refresh.max_age_minutes, 5);
        assert_eq!(config.logging.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let result = Config::from_file("/nonexistent/cdews.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        assert!(matches!(
            Config::from_toml_str("[api\nbase_url = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_toml_str("[api]\nbase_url = \"localhost:8000\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[api]\ntimeout_secs = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[map]\ncenter_lat = 120.0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "http://10.0.0.5:8000"),
            (ENV_LOG_LEVEL, "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api.base_url, "http://10.0.0.5:8000");
        assert_eq!(config.logging.log_level(), LogLevel::Warning);
    }

    #[test]
    fn test_blank_env_value_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_info() {
        let logging = LoggingConfig {
            level: "chatty".to_string(),
            file: None,
        };
        assert_eq!(logging.log_level(), LogLevel::Info);
    }
}
