//! Client-facing views of nodes and values, and the broadcast envelope.

use serde::{Deserialize, Serialize};

use crate::{NodeKey, ValueGenre, ValueKey, ValueType};

/// Topic used when a node's projection has changed.
pub const TOPIC_NODE_UPDATED: &str = "node-updated";

/// Classification and naming fields the driver reports for a node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Basic device class.
    pub basic_type: u8,
    /// Generic device class.
    pub generic_type: u8,
    /// Specific device class.
    pub specific_type: u8,
    /// Human-readable device class label.
    pub node_type: String,
    /// Manufacturer name from the device database.
    pub manufacturer_name: String,
    /// Product name from the device database.
    pub product_name: String,
    /// User-assigned node name.
    pub name: String,
    /// User-assigned location.
    pub location: String,
    /// Manufacturer id (hex string).
    pub manufacturer_id: String,
    /// Product type (hex string).
    pub product_type: String,
    /// Product id (hex string).
    pub product_id: String,
}

/// Read-only view of a node, flattened for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Stable `home:node` key.
    pub node_info_id: NodeKey,
    /// Network (home) id.
    pub home_id: u32,
    /// Node id within the network.
    pub node_id: u8,
    /// Basic device class.
    pub basic_type: u8,
    /// Generic device class.
    pub generic_type: u8,
    /// Specific device class.
    pub specific_type: u8,
    /// Device class label.
    pub node_type: String,
    /// Manufacturer name.
    pub manufacturer_name: String,
    /// Product name.
    pub product_name: String,
    /// User-assigned node name.
    pub node_name: String,
    /// User-assigned location.
    pub location: String,
    /// Manufacturer id.
    pub manufacturer_id: String,
    /// Product type.
    pub product_type: String,
    /// Product id.
    pub product_id: String,
    /// Values in the order the node first reported them.
    #[serde(default)]
    pub values: Vec<ValueSummary>,
}

impl NodeSummary {
    /// Flatten a key and its metadata into a summary with no values.
    pub fn from_metadata(key: NodeKey, metadata: &NodeMetadata) -> Self {
        Self {
            node_info_id: key,
            home_id: key.home_id(),
            node_id: key.node_id(),
            basic_type: metadata.basic_type,
            generic_type: metadata.generic_type,
            specific_type: metadata.specific_type,
            node_type: metadata.node_type.clone(),
            manufacturer_name: metadata.manufacturer_name.clone(),
            product_name: metadata.product_name.clone(),
            node_name: metadata.name.clone(),
            location: metadata.location.clone(),
            manufacturer_id: metadata.manufacturer_id.clone(),
            product_type: metadata.product_type.clone(),
            product_id: metadata.product_id.clone(),
            values: Vec::new(),
        }
    }
}

/// Read-only view of a value, with the live fields queried from the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSummary {
    /// Driver-assigned value key.
    pub value_id: ValueKey,
    /// Id of the owning node.
    pub node_id: u8,
    /// Settings group.
    pub genre: ValueGenre,
    /// Owning command class.
    pub command_class_id: u8,
    /// Data type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Value cannot be written.
    pub read_only: bool,
    /// Value cannot be read.
    pub write_only: bool,
    /// Value has been set by the device.
    pub set: bool,
    /// Value is being polled.
    pub polled: bool,
    /// Label from the device database.
    pub label: String,
    /// Units label.
    pub units: String,
    /// Help text.
    pub help: String,
    /// Lower bound.
    pub min: i32,
    /// Upper bound.
    pub max: i32,
    /// Current value rendered as a string.
    #[serde(rename = "string")]
    pub as_string: String,
}

/// A message fanned out to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Message topic, e.g. [`TOPIC_NODE_UPDATED`].
    pub topic: String,
    /// The node's current projection.
    pub payload: NodeSummary,
}

impl BroadcastMessage {
    /// A `"node-updated"` message for the given projection.
    pub fn node_updated(payload: NodeSummary) -> Self {
        Self {
            topic: TOPIC_NODE_UPDATED.to_string(),
            payload,
        }
    }
}
