//! Error types for sync-manager.

use std::fmt;
use zwave_sync_driver::DriverError;
use zwave_sync_types::NodeKey;

/// Main error type for sync-manager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The session could not be started.
    #[error("startup failed: {0}")]
    Startup(#[from] StartupError),

    /// The session ended on an unrecoverable error.
    #[error("processing failed: {0}")]
    Processing(#[from] ProcessingError),

    /// A request named a node that is not in the directory.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A driver call made on behalf of a request failed.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// A blocking driver call did not complete.
    #[error("driver task failed: {0}")]
    Task(String),

    /// `run()` was called on a session that is not running.
    #[error("session is not running (state: {0})")]
    NotRunning(&'static str),
}

/// Failures while bringing a session up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartupError {
    /// `start()` was called twice.
    #[error("session already started")]
    AlreadyStarted,

    /// The driver rejected its options.
    #[error("driver configuration failed: {0}")]
    Configure(DriverError),

    /// Notification registration failed.
    #[error("notification registration failed: {0}")]
    Register(DriverError),

    /// The driver refused to attach to the controller.
    #[error("driver refused to open session on {path}")]
    OpenSession {
        /// Controller device path.
        path: String,
    },

    /// The blocking startup task did not complete.
    #[error("startup task failed: {0}")]
    Task(String),
}

/// Failures while handling one notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessingError {
    /// The driver reported that it failed.
    #[error("driver failed for network {home_id:#010x}")]
    DriverFailed {
        /// Network (home) id.
        home_id: u32,
    },

    /// Every producer of the notification queue has gone away.
    #[error("notification queue closed")]
    QueueClosed,

    /// A driver call made while handling the notification failed.
    #[error("driver call for {kind} failed: {source}")]
    Driver {
        /// Kind of notification being handled.
        kind: &'static str,
        /// Underlying driver error.
        source: DriverError,
    },

    /// A blocking driver call did not complete.
    #[error("driver task for {kind} failed: {reason}")]
    Task {
        /// Kind of notification being handled.
        kind: &'static str,
        /// Join failure description.
        reason: String,
    },
}

impl ProcessingError {
    /// Whether the session can no longer continue.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::DriverFailed { .. } | Self::QueueClosed => true,
            Self::Driver { source, .. } => source.is_session_loss(),
            Self::Task { .. } => false,
        }
    }
}

/// A request named a node the directory does not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No record for the key.
    #[error("node not found: {0}")]
    NodeNotFound(NodeKey),
}

/// One step of session teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    /// Detach from the controller.
    CloseSession,
    /// Stop notification delivery.
    DeregisterNotifications,
    /// Release the driver instance.
    ReleaseDriver,
    /// Release the process-wide options.
    ReleaseOptions,
}

impl TeardownStep {
    /// All steps, in the order they run.
    pub const ORDER: [TeardownStep; 4] = [
        Self::CloseSession,
        Self::DeregisterNotifications,
        Self::ReleaseDriver,
        Self::ReleaseOptions,
    ];
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CloseSession => "close session",
            Self::DeregisterNotifications => "deregister notifications",
            Self::ReleaseDriver => "release driver",
            Self::ReleaseOptions => "release options",
        })
    }
}

/// A teardown step that did not succeed. Later steps still run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TeardownError {
    /// The step reported failure.
    #[error("teardown step '{step}' failed: {reason}")]
    Step {
        /// Which step.
        step: TeardownStep,
        /// What went wrong.
        reason: String,
    },

    /// Teardown did not finish in time.
    #[error("teardown did not finish within {secs}s")]
    TimedOut {
        /// Configured bound.
        secs: u64,
    },

    /// The blocking teardown task did not complete.
    #[error("teardown task failed: {0}")]
    Task(String),
}

/// Result type alias for manager operations.
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Result type alias for notification handling.
pub type ProcessingResult<T> = std::result::Result<T, ProcessingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(ProcessingError::DriverFailed { home_id: 1 }.is_fatal());
        assert!(ProcessingError::QueueClosed.is_fatal());
        assert!(ProcessingError::Driver {
            kind: "node_naming",
            source: DriverError::SessionLost,
        }
        .is_fatal());
        assert!(!ProcessingError::Driver {
            kind: "node_naming",
            source: DriverError::NodeNotFound(NodeKey::new(1, 2)),
        }
        .is_fatal());
        assert!(!ProcessingError::Task {
            kind: "node_added",
            reason: "panicked".into(),
        }
        .is_fatal());
    }

    #[test]
    fn teardown_order() {
        assert_eq!(TeardownStep::ORDER[0], TeardownStep::CloseSession);
        assert_eq!(TeardownStep::ORDER[3], TeardownStep::ReleaseOptions);
        assert_eq!(TeardownStep::ReleaseDriver.to_string(), "release driver");
    }

    #[test]
    fn messages_name_the_subject() {
        let err = ProcessingError::DriverFailed { home_id: 0xC0FFEE };
        assert_eq!(err.to_string(), "driver failed for network 0x00c0ffee");

        let err = ManagerError::from(LookupError::NodeNotFound(NodeKey::new(1, 5)));
        assert_eq!(err.to_string(), "node not found: 1:5");
    }
}
