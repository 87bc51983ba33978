//! # sync-types
//!
//! Identity and wire types for zwave-sync.
//!
//! This crate provides the foundational types used across all zwave-sync crates:
//! - [`NodeKey`], [`ValueKey`], [`ValueId`] - Identity of nodes and values
//! - [`NotificationEvent`] - Events pushed by the device-network driver
//! - [`NodeMetadata`] - Classification fields the driver reports for a node
//! - [`NodeSummary`], [`ValueSummary`], [`BroadcastMessage`] - Client-facing views
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod notification;
mod summary;
mod value;

pub use error::TypesError;
pub use ids::{NodeKey, ValueKey};
pub use notification::NotificationEvent;
pub use summary::{BroadcastMessage, NodeMetadata, NodeSummary, ValueSummary, TOPIC_NODE_UPDATED};
pub use value::{ValueGenre, ValueId, ValueType};
