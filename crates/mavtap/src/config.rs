//! Configuration management for mavtap.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::Direction;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "mavtap";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables, named `MAVTAP_<SECTION>__<KEY>` with a double
///    underscore between section and key so snake_case keys stay intact
///    (e.g. `MAVTAP_TAP__RECEIVE_TIMEOUT_MS`, `MAVTAP_LOG__FILE_PREFIX`)
/// 2. TOML config file at `~/.config/mavtap/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tap endpoint and capture loop configuration.
    pub tap: TapConfig,
    /// Session log configuration.
    pub log: LogConfig,
}

/// Tap-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    /// UDP endpoint the relay duplicates the stream to.
    pub endpoint: String,
    /// Bound on each receive in milliseconds; also the stop-latency bound.
    pub receive_timeout_ms: u64,
    /// Direction stamped on captured records (`RX` or `TX`).
    pub direction: String,
}

/// Log-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory for session log files.
    /// Defaults to `~/.local/share/mavtap/logs`
    pub directory: Option<PathBuf>,
    /// File name prefix for session logs.
    pub file_prefix: String,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            // MAVProxy's conventional JSON tap output port.
            endpoint: "127.0.0.1:14552".to_string(),
            receive_timeout_ms: 1000,
            direction: "RX".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: None, // Will be resolved to default at runtime
            file_prefix: "mavlink_messages".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        // Split on a double underscore: a single one would shatter
        // snake_case keys like `receive_timeout_ms` into nested paths.
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("MAVTAP_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.tap.endpoint.parse::<SocketAddr>().is_err() {
            return Err(Error::ConfigValidation {
                message: format!("endpoint is not a socket address: {}", self.tap.endpoint),
            });
        }

        if self.tap.receive_timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "receive_timeout_ms must be greater than 0".to_string(),
            });
        }

        if !matches!(self.tap.direction.as_str(), "RX" | "TX") {
            return Err(Error::ConfigValidation {
                message: format!("direction must be RX or TX, got: {}", self.tap.direction),
            });
        }

        if self.log.file_prefix.is_empty() {
            return Err(Error::ConfigValidation {
                message: "file_prefix must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the tap endpoint as a socket address.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the endpoint does not parse.
    pub fn endpoint(&self) -> Result<SocketAddr> {
        self.tap
            .endpoint
            .parse()
            .map_err(|_| Error::ConfigValidation {
                message: format!("endpoint is not a socket address: {}", self.tap.endpoint),
            })
    }

    /// Get the receive timeout as a Duration.
    #[must_use]
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.tap.receive_timeout_ms)
    }

    /// Get the configured record direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.tap.direction == "TX" {
            Direction::Tx
        } else {
            Direction::Rx
        }
    }

    /// Get the log directory, resolving defaults if not set.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.log
            .directory
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("logs"))
    }

    /// Build the log file path for a session starting at `now`.
    #[must_use]
    pub fn session_log_path(&self, now: DateTime<Utc>) -> PathBuf {
        let name = format!(
            "{}_{}.jsonl",
            self.log.file_prefix,
            now.format("%Y%m%d_%H%M%S")
        );
        self.log_dir().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tap.endpoint, "127.0.0.1:14552");
        assert_eq!(config.tap.receive_timeout_ms, 1000);
        assert_eq!(config.tap.direction, "RX");
        assert!(config.log.directory.is_none());
        assert_eq!(config.log.file_prefix, "mavlink_messages");
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_endpoint() {
        let mut config = Config::default();
        config.tap.endpoint = "not-an-address".to_string();

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("socket address"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.tap.receive_timeout_ms = 0;

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("receive_timeout_ms"));
    }

    #[test]
    fn test_validate_bad_direction() {
        let mut config = Config::default();
        config.tap.direction = "BOTH".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_prefix() {
        let mut config = Config::default();
        config.log.file_prefix = String::new();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_parses() {
        let config = Config::default();
        let addr = config.endpoint().unwrap();
        assert_eq!(addr.port(), 14552);
    }

    #[test]
    fn test_receive_timeout() {
        let config = Config::default();
        assert_eq!(config.receive_timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn test_direction_mapping() {
        let mut config = Config::default();
        assert_eq!(config.direction(), Direction::Rx);
        config.tap.direction = "TX".to_string();
        assert_eq!(config.direction(), Direction::Tx);
    }

    #[test]
    fn test_log_dir_default() {
        let config = Config::default();
        let dir = config.log_dir();
        assert!(dir.to_string_lossy().contains("mavtap"));
        assert!(dir.to_string_lossy().ends_with("logs"));
    }

    #[test]
    fn test_log_dir_custom() {
        let mut config = Config::default();
        config.log.directory = Some(PathBuf::from("/var/log/tap"));
        assert_eq!(config.log_dir(), PathBuf::from("/var/log/tap"));
    }

    #[test]
    fn test_session_log_path_naming() {
        let mut config = Config::default();
        config.log.directory = Some(PathBuf::from("/tmp/logs"));
        let now = "2024-06-01T12:34:56Z".parse().unwrap();
        assert_eq!(
            config.session_log_path(now),
            PathBuf::from("/tmp/logs/mavlink_messages_20240601_123456.jsonl")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("mavtap"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    // Loading reads the process environment, so every test that calls
    // `load_from` runs inside a figment Jail to keep env state isolated.

    #[test]
    fn test_load_nonexistent_config() {
        figment::Jail::expect_with(|_jail| {
            // Loading from a nonexistent path should work (uses defaults)
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .expect("defaults should load");
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[tap]\nendpoint = \"0.0.0.0:15000\"\nreceive_timeout_ms = 500\n",
            )?;

            let config = Config::load_from(Some(jail.directory().join("config.toml")))
                .expect("file should load");
            assert_eq!(config.tap.endpoint, "0.0.0.0:15000");
            assert_eq!(config.tap.receive_timeout_ms, 500);
            // Untouched sections keep their defaults.
            assert_eq!(config.log.file_prefix, "mavlink_messages");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_snake_case_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MAVTAP_TAP__ENDPOINT", "127.0.0.1:15999");
            jail.set_env("MAVTAP_TAP__RECEIVE_TIMEOUT_MS", "250");
            jail.set_env("MAVTAP_LOG__FILE_PREFIX", "bench");

            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .expect("env overrides should load");
            assert_eq!(config.tap.endpoint, "127.0.0.1:15999");
            assert_eq!(config.tap.receive_timeout_ms, 250);
            assert_eq!(config.log.file_prefix, "bench");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_beat_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[tap]\nreceive_timeout_ms = 500\n")?;
            jail.set_env("MAVTAP_TAP__RECEIVE_TIMEOUT_MS", "250");

            let config = Config::load_from(Some(jail.directory().join("config.toml")))
                .expect("layered config should load");
            assert_eq!(config.tap.receive_timeout_ms, 250);
            Ok(())
        });
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("endpoint"));
        assert!(json.contains("file_prefix"));
    }
}
