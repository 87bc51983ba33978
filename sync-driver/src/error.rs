//! Driver error types.

use thiserror::Error;
use zwave_sync_types::{NodeKey, ValueKey};

/// Errors reported across the driver boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The driver does not know the node.
    #[error("node not found: {0}")]
    NodeNotFound(NodeKey),

    /// The driver does not know the value.
    #[error("value {value} not found on node {node}")]
    ValueNotFound {
        /// Owning node.
        node: NodeKey,
        /// Missing value.
        value: ValueKey,
    },

    /// The driver session is gone (controller unplugged, driver failed).
    #[error("driver session lost")]
    SessionLost,

    /// Registering or deregistering the notification watcher failed.
    #[error("notification registration failed: {0}")]
    Registration(String),

    /// The driver rejected its options.
    #[error("driver configuration rejected: {0}")]
    Rejected(String),

    /// The notification queue has no consumer any more.
    #[error("notification queue closed")]
    QueueClosed,

    /// The notification queue is full.
    #[error("notification queue full")]
    QueueFull,
}

impl DriverError {
    /// Whether this error means the session can no longer be used.
    pub fn is_session_loss(&self) -> bool {
        matches!(self, Self::SessionLost | Self::QueueClosed)
    }
}

/// Result type alias for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_loss_classification() {
        assert!(DriverError::SessionLost.is_session_loss());
        assert!(DriverError::QueueClosed.is_session_loss());
        assert!(!DriverError::QueueFull.is_session_loss());
        let missing = DriverError::NodeNotFound(NodeKey::new(1, 2));
        assert!(!missing.is_session_loss());
    }

    #[test]
    fn error_display() {
        let err = DriverError::ValueNotFound {
            node: NodeKey::new(1, 5),
            value: ValueKey::new(42),
        };
        assert_eq!(err.to_string(), "value 42 not found on node 1:5");
    }
}
