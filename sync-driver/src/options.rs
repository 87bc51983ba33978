//! Options handed to the driver before a session is opened.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Driver log verbosity, in the driver's own numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Disable logging.
    None,
    /// Always log.
    Always,
    /// Fatal errors only.
    Fatal,
    /// Errors.
    Error,
    /// Warnings.
    Warning,
    /// Alerts.
    Alert,
    /// Informational.
    Info,
    /// Detailed.
    Detail,
    /// Debug.
    Debug,
    /// Every byte on the wire.
    StreamDetail,
    /// Driver internals.
    Internal,
}

impl LogLevel {
    /// The integer the native driver expects.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::None => 1,
            Self::Always => 2,
            Self::Fatal => 3,
            Self::Error => 4,
            Self::Warning => 5,
            Self::Alert => 6,
            Self::Info => 7,
            Self::Detail => 8,
            Self::Debug => 9,
            Self::StreamDetail => 10,
            Self::Internal => 11,
        }
    }
}

/// A single option value as the native driver stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Integer option.
    Int(i32),
    /// Boolean option.
    Bool(bool),
    /// String option.
    Str(String),
}

/// Driver-wide options, applied once per process before a session opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverOptions {
    /// Directory holding the driver's device database.
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,
    /// Writable directory for the driver's cache and logs (empty = driver default).
    #[serde(default)]
    pub user_path: PathBuf,
    /// Extra driver command-line options.
    #[serde(default)]
    pub command_line: String,
    /// Level written to the driver log file.
    #[serde(default = "default_quiet_level")]
    pub save_log_level: LogLevel,
    /// Level held in the driver's in-memory queue.
    #[serde(default = "default_quiet_level")]
    pub queue_log_level: LogLevel,
    /// Level at which the queued log is dumped.
    #[serde(default = "default_dump_trigger")]
    pub dump_trigger: LogLevel,
    /// Milliseconds between polls of polled values.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u32,
    /// Treat the poll interval as the gap between individual polls.
    #[serde(default = "default_true")]
    pub interval_between_polls: bool,
    /// Have the driver confirm suspicious value changes before reporting them.
    #[serde(default = "default_true")]
    pub validate_value_changes: bool,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("/usr/local/etc/openzwave/")
}

fn default_quiet_level() -> LogLevel {
    LogLevel::None
}

fn default_dump_trigger() -> LogLevel {
    LogLevel::Error
}

fn default_poll_interval_ms() -> u32 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            user_path: PathBuf::new(),
            command_line: String::new(),
            save_log_level: default_quiet_level(),
            queue_log_level: default_quiet_level(),
            dump_trigger: default_dump_trigger(),
            poll_interval_ms: default_poll_interval_ms(),
            interval_between_polls: default_true(),
            validate_value_changes: default_true(),
        }
    }
}

impl DriverOptions {
    /// The named options, as a native driver would register them.
    pub fn entries(&self) -> Vec<(&'static str, OptionValue)> {
        vec![
            ("SaveLogLevel", OptionValue::Int(self.save_log_level.as_i32())),
            ("QueueLogLevel", OptionValue::Int(self.queue_log_level.as_i32())),
            ("DumpTrigger", OptionValue::Int(self.dump_trigger.as_i32())),
            (
                "PollInterval",
                OptionValue::Int(i32::try_from(self.poll_interval_ms).unwrap_or(i32::MAX)),
            ),
            (
                "IntervalBetweenPolls",
                OptionValue::Bool(self.interval_between_polls),
            ),
            (
                "ValidateValueChanges",
                OptionValue::Bool(self.validate_value_changes),
            ),
            ("CommandLine", OptionValue::Str(self.command_line.clone())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_usual_setup() {
        let options = DriverOptions::default();
        assert_eq!(
            options.config_path,
            PathBuf::from("/usr/local/etc/openzwave/")
        );
        assert_eq!(options.save_log_level, LogLevel::None);
        assert_eq!(options.dump_trigger.as_i32(), 4);
        assert_eq!(options.poll_interval_ms, 500);
        assert!(options.interval_between_polls);
        assert!(options.validate_value_changes);
    }

    #[test]
    fn entries_carry_native_names() {
        let entries = DriverOptions::default().entries();
        assert!(entries.contains(&("DumpTrigger", OptionValue::Int(4))));
        assert!(entries.contains(&("PollInterval", OptionValue::Int(500))));
        assert!(entries.contains(&("SaveLogLevel", OptionValue::Int(1))));
        let validate = ("ValidateValueChanges", OptionValue::Bool(true));
        assert!(entries.contains(&validate));
    }

    #[test]
    fn options_from_toml_use_defaults_for_missing_fields() {
        let options: DriverOptions = toml::from_str(
            r#"
config_path = "/opt/ozw/config"
queue_log_level = "debug"
poll_interval_ms = 2000
"#,
        )
        .unwrap();
        assert_eq!(options.config_path, PathBuf::from("/opt/ozw/config"));
        assert_eq!(options.queue_log_level, LogLevel::Debug);
        assert_eq!(options.poll_interval_ms, 2000);
        assert_eq!(options.save_log_level, LogLevel::None);
        assert!(options.validate_value_changes);
    }

    #[test]
    fn huge_poll_interval_saturates() {
        let options = DriverOptions {
            poll_interval_ms: u32::MAX,
            ..DriverOptions::default()
        };
        assert!(options
            .entries()
            .contains(&("PollInterval", OptionValue::Int(i32::MAX))));
    }
}
