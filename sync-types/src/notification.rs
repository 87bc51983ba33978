//! Notifications pushed by the device-network driver.

use serde::{Deserialize, Serialize};

use crate::{NodeKey, ValueId};

/// An asynchronous event describing a change in network, node or value state.
///
/// Serialized with an internal `type` tag so that notification scripts can be
/// written by hand:
///
/// ```json
/// {"type":"value_added","node":"1:5","value":{"key":42,"genre":"user","command_class_id":37,"type":"bool"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A node has been discovered or re-added.
    NodeAdded {
        /// The node.
        node: NodeKey,
    },
    /// A node has left the network.
    NodeRemoved {
        /// The node.
        node: NodeKey,
    },
    /// One of the node's names (node, manufacturer, product) changed.
    NodeNaming {
        /// The node.
        node: NodeKey,
    },
    /// A value was created on a node.
    ValueAdded {
        /// The owning node.
        node: NodeKey,
        /// The value.
        value: ValueId,
    },
    /// A value's data changed.
    ValueChanged {
        /// The owning node.
        node: NodeKey,
        /// The value.
        value: ValueId,
    },
    /// A value was removed from a node.
    ValueRemoved {
        /// The owning node.
        node: NodeKey,
        /// The value.
        value: ValueId,
    },
    /// All awake nodes have been queried.
    AwakeNodesQueried {
        /// The controller node.
        node: NodeKey,
    },
    /// All nodes have been queried.
    AllNodesQueried {
        /// The controller node.
        node: NodeKey,
    },
    /// All nodes have been queried but some are dead.
    AllNodesQueriedSomeDead {
        /// The controller node.
        node: NodeKey,
    },
    /// The controller for a home id is ready.
    DriverReady {
        /// The network the driver serves.
        home_id: u32,
    },
    /// The controller could not be initialised or has gone away.
    DriverFailed {
        /// The network the driver served.
        home_id: u32,
    },
}

impl NotificationEvent {
    /// The node this notification refers to, if any.
    pub fn node_key(&self) -> Option<NodeKey> {
        match self {
            Self::NodeAdded { node }
            | Self::NodeRemoved { node }
            | Self::NodeNaming { node }
            | Self::ValueAdded { node, .. }
            | Self::ValueChanged { node, .. }
            | Self::ValueRemoved { node, .. }
            | Self::AwakeNodesQueried { node }
            | Self::AllNodesQueried { node }
            | Self::AllNodesQueriedSomeDead { node } => Some(*node),
            Self::DriverReady { .. } | Self::DriverFailed { .. } => None,
        }
    }

    /// The value this notification refers to, if any.
    pub fn value(&self) -> Option<&ValueId> {
        match self {
            Self::ValueAdded { value, .. }
            | Self::ValueChanged { value, .. }
            | Self::ValueRemoved { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Short name of the notification kind, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NodeAdded { .. } => "node_added",
            Self::NodeRemoved { .. } => "node_removed",
            Self::NodeNaming { .. } => "node_naming",
            Self::ValueAdded { .. } => "value_added",
            Self::ValueChanged { .. } => "value_changed",
            Self::ValueRemoved { .. } => "value_removed",
            Self::AwakeNodesQueried { .. } => "awake_nodes_queried",
            Self::AllNodesQueried { .. } => "all_nodes_queried",
            Self::AllNodesQueriedSomeDead { .. } => "all_nodes_queried_some_dead",
            Self::DriverReady { .. } => "driver_ready",
            Self::DriverFailed { .. } => "driver_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ValueGenre, ValueKey, ValueType};

    fn value(key: u64) -> ValueId {
        ValueId::new(ValueKey::new(key), ValueGenre::User, 0x25, ValueType::Bool)
    }

    #[test]
    fn parses_hand_written_script_line() {
        let line = concat!(
            r#"{"type":"value_added","node":"1:5","#,
            r#""value":{"key":42,"genre":"user","command_class_id":37,"type":"bool"}}"#,
        );
        let event: NotificationEvent = serde_json::from_str(line).unwrap();
        assert_eq!(
            event,
            NotificationEvent::ValueAdded {
                node: NodeKey::new(1, 5),
                value: value(42),
            }
        );
    }

    #[test]
    fn tag_matches_kind() {
        let events = [
            NotificationEvent::NodeAdded { node: NodeKey::new(1, 2) },
            NotificationEvent::AllNodesQueriedSomeDead { node: NodeKey::new(1, 1) },
            NotificationEvent::DriverFailed { home_id: 1 },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.kind());
        }
    }

    #[test]
    fn node_and_value_accessors() {
        let event = NotificationEvent::ValueRemoved {
            node: NodeKey::new(1, 5),
            value: value(7),
        };
        assert_eq!(event.node_key(), Some(NodeKey::new(1, 5)));
        assert_eq!(event.value().map(|v| v.key), Some(ValueKey::new(7)));

        let ready = NotificationEvent::DriverReady { home_id: 9 };
        assert_eq!(ready.node_key(), None);
        assert!(ready.value().is_none());
    }
}
