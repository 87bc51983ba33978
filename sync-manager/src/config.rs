//! Configuration loading for zwave-sync.
//!
//! Configuration is loaded from a TOML file (default: `zwsync.toml`). Every
//! section and every field may be omitted.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use zwave_sync_driver::DriverOptions;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Options handed to the driver before the session opens.
    #[serde(default)]
    pub driver: DriverOptions,
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Broadcast configuration.
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    /// HTTP endpoints configuration.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Controller device path (default: /dev/ttyACM0).
    #[serde(default = "default_controller_path")]
    pub controller_path: String,
    /// Pending notifications held before the driver is made to wait (default: 10).
    #[serde(default = "default_notification_queue")]
    pub notification_queue: usize,
    /// Upper bound on driver teardown in seconds (default: 30).
    #[serde(default = "default_teardown_timeout_secs")]
    pub teardown_timeout_secs: u64,
}

/// Broadcast configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Messages buffered per subscriber before it starts lagging (default: 64).
    #[serde(default = "default_broadcast_capacity")]
    pub capacity: usize,
    /// Broadcast a node whenever one of its values is added or changes,
    /// once the initial query is complete (default: false).
    #[serde(default)]
    pub value_changes: bool,
    /// Broadcast every node when the initial query completes (default: false).
    #[serde(default)]
    pub query_complete: bool,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Bind address for the HTTP server (default: 127.0.0.1:8080).
    #[serde(default = "default_http_bind")]
    pub bind_address: String,
    /// Serve HTTP at all (default: true).
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_controller_path() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_notification_queue() -> usize {
    10
}

fn default_teardown_timeout_secs() -> u64 {
    30
}

fn default_broadcast_capacity() -> usize {
    64
}

fn default_http_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_http_enabled() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            controller_path: default_controller_path(),
            notification_queue: default_notification_queue(),
            teardown_timeout_secs: default_teardown_timeout_secs(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            capacity: default_broadcast_capacity(),
            value_changes: false,
            query_complete: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_http_bind(),
            enabled: default_http_enabled(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// parsed values are unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.controller_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "session.controller_path",
                reason: "must not be empty".into(),
            });
        }
        if self.session.notification_queue == 0 {
            return Err(ConfigError::Invalid {
                field: "session.notification_queue",
                reason: "must be at least 1".into(),
            });
        }
        if self.broadcast.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "broadcast.capacity",
                reason: "must be at least 1".into(),
            });
        }
        if self.http.enabled && self.http.bind_address.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid {
                field: "http.bind_address",
                reason: format!("not a socket address: {}", self.http.bind_address),
            });
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value parsed but is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zwave_sync_driver::LogLevel;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.session.controller_path, "/dev/ttyACM0");
        assert_eq!(config.session.notification_queue, 10);
        assert_eq!(config.broadcast.capacity, 64);
        assert!(!config.broadcast.value_changes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[driver]
config_path = "/opt/ozw/config"
save_log_level = "info"

[session]
controller_path = "/dev/ttyUSB1"
teardown_timeout_secs = 5

[broadcast]
capacity = 8
value_changes = true

[http]
bind_address = "0.0.0.0:9090"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.driver.config_path, PathBuf::from("/opt/ozw/config"));
        assert_eq!(config.driver.save_log_level, LogLevel::Info);
        assert_eq!(config.session.controller_path, "/dev/ttyUSB1");
        assert_eq!(config.session.teardown_timeout_secs, 5);
        assert_eq!(config.broadcast.capacity, 8);
        assert!(config.broadcast.value_changes);
        assert!(!config.broadcast.query_complete);
        assert_eq!(config.http.bind_address, "0.0.0.0:9090");
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.session.teardown_timeout_secs, 30);
        assert_eq!(config.driver.poll_interval_ms, 500);
        assert!(config.http.enabled);
    }

    #[test]
    fn zero_queue_is_rejected() {
        let mut config = Config::default();
        config.session.notification_queue = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "session.notification_queue",
                ..
            })
        ));
    }

    #[test]
    fn bad_bind_address_only_matters_when_enabled() {
        let mut config = Config::default();
        config.http.bind_address = "not-an-address".into();
        assert!(config.validate().is_err());

        config.http.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nnotification_queue = \"lots\"").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        let path = file.path().display().to_string();
        assert!(err.to_string().contains(&path));
    }

    #[test]
    fn from_file_missing() {
        let path = Path::new("/nonexistent/zwsync.toml");
        let err = Config::from_file(path).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
