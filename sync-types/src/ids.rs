//! Identity types for nodes and values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Identifies a node on a Z-Wave network.
///
/// A home id (the controller's network) plus the node id within it.
/// Displayed and serialized as `"{home_id}:{node_id}"`, which is also the
/// `node_info_id` clients see.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodeKey {
    home_id: u32,
    node_id: u8,
}

impl NodeKey {
    /// Create a NodeKey from its components.
    pub fn new(home_id: u32, node_id: u8) -> Self {
        Self { home_id, node_id }
    }

    /// The network (home) identifier.
    pub fn home_id(&self) -> u32 {
        self.home_id
    }

    /// The node identifier within the network.
    pub fn node_id(&self) -> u8 {
        self.node_id
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.home_id, self.node_id)
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({self})")
    }
}

impl FromStr for NodeKey {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypesError::InvalidNodeKey(s.to_string());

        let (home, node) = s.split_once(':').ok_or_else(invalid)?;
        let home_id = home.parse::<u32>().map_err(|_| invalid())?;
        let node_id = node.parse::<u8>().map_err(|_| invalid())?;
        Ok(Self::new(home_id, node_id))
    }
}

impl From<NodeKey> for String {
    fn from(key: NodeKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for NodeKey {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Driver-assigned identifier of a value, unique within its node.
///
/// Opaque to this crate; only compared and hashed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueKey(u64);

impl ValueKey {
    /// Wrap a raw driver value id.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw 64-bit identifier.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueKey({:#018x})", self.0)
    }
}
