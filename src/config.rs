//! Configuration file parser for ~/.config/creel/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Startup-only errors. Anything here is fatal: once the scheduler is
/// running, no configuration is re-read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("invalid interval '{0}': expected seconds or an s/m/h suffix (90, 30s, 5m, 1h)")]
    InvalidInterval(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file path. `None` means `<config dir>/creel.db`.
    pub database_path: Option<String>,

    /// User-Agent presented to feed hosts.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            user_agent: crate::ingest::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file. A missing or empty file is not
    /// an error and yields the defaults; invalid TOML is fatal. Unrecognized
    /// keys are accepted with a warning so a typo does not silently revert a
    /// setting to its default.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        if content.len() as u64 > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                content.len(),
                Self::MAX_FILE_SIZE
            )));
        }
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !["database_path", "user_agent"].contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unrecognized config key");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Interval Parsing
// ============================================================================

/// Parse the scheduler's fetch interval from its CLI form.
///
/// Accepts bare seconds (`90`) or a single `s`/`m`/`h` suffix (`30s`, `5m`,
/// `1h`). Anything else, including a zero duration, is a fatal startup
/// error.
pub fn parse_interval(raw: &str) -> Result<Duration, ConfigError> {
    let raw = raw.trim();
    let invalid = || ConfigError::InvalidInterval(raw.to_string());

    let (digits, multiplier) = match raw.strip_suffix(&['s', 'm', 'h'][..]) {
        Some(digits) => {
            let multiplier = match raw.as_bytes()[raw.len() - 1] {
                b's' => 1,
                b'm' => 60,
                _ => 3600,
            };
            (digits, multiplier)
        }
        None => (raw, 1),
    };

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs(value * multiplier))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database_path.is_none());
        assert!(config.user_agent.contains("creel"));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/creel_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = std::env::temp_dir().join("creel_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "database_path = \"/var/lib/creel/creel.db\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.database_path.as_deref(),
            Some("/var/lib/creel/creel.db")
        );
        assert!(config.user_agent.contains("creel"));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = std::env::temp_dir().join("creel_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "database_path = [not toml").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_parse_interval_accepts_known_forms() {
        assert_eq!(parse_interval("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_interval(" 10s ").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_interval_rejects_garbage() {
        for bad in ["", "0", "0s", "-5s", "ten", "5x", "1.5m", "m", "5 m"] {
            assert!(
                matches!(parse_interval(bad), Err(ConfigError::InvalidInterval(_))),
                "expected {:?} to be rejected",
                bad
            );
        }
    }
}
