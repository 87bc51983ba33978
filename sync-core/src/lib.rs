//! # sync-core
//!
//! Pure logic for zwave-sync (no I/O, instant tests).
//!
//! This crate holds the directory of nodes and values and the dispatcher
//! lifecycle state machine, without any driver or network access.
//!
//! ## Design Philosophy
//!
//! Nothing in this crate blocks on a device or awaits anything:
//! - [`NodeDirectory`] guards its map with one lock and hands out owned copies
//! - [`DispatchState`] takes events and returns the actions to perform
//!
//! The driver calls and the async loop live in `sync-manager`, which
//! interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod directory;
pub mod state;

pub use directory::{NodeDirectory, NodeRecord, ValueRecord};
pub use state::{Action, DispatchState, LifecycleEvent, StopReason};
