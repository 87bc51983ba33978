//! Value identity as reported by the driver.

use serde::{Deserialize, Serialize};

use crate::ValueKey;

/// Which group of settings a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueGenre {
    /// The "level" as controlled by basic commands.
    #[default]
    Basic,
    /// Values an ordinary user would be interested in.
    User,
    /// Device-specific configuration parameters.
    Config,
    /// Values of significance only to users who understand the protocol.
    System,
}

/// The data type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Boolean.
    #[default]
    Bool,
    /// 8-bit unsigned.
    Byte,
    /// Fixed-point decimal, carried as a string.
    Decimal,
    /// 32-bit signed.
    Int,
    /// One item from a list.
    List,
    /// Climate schedule.
    Schedule,
    /// 16-bit signed.
    Short,
    /// Text.
    String,
    /// Write-only trigger.
    Button,
    /// Raw bytes.
    Raw,
}

/// Full identity of a value: the key plus the classification the driver
/// attaches to it.
///
/// This is what Value* notifications carry and what accessor calls take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueId {
    /// Driver-assigned key, unique within the node.
    pub key: ValueKey,
    /// Settings group.
    pub genre: ValueGenre,
    /// Command class that owns the value.
    pub command_class_id: u8,
    /// Data type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

impl ValueId {
    /// Build a ValueId.
    pub fn new(
        key: ValueKey,
        genre: ValueGenre,
        command_class_id: u8,
        value_type: ValueType,
    ) -> Self {
        Self {
            key,
            genre,
            command_class_id,
            value_type,
        }
    }
}
