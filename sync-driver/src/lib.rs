//! # sync-driver
//!
//! The boundary between zwave-sync and the device-network driver.
//!
//! The driver itself (the native Z-Wave stack) is an external collaborator.
//! This crate describes what the engine needs from it:
//! - [`DeviceDriver`] - session control and synchronous metadata accessors
//! - [`NotificationSink`] / [`NotificationStream`] - the ordered queue that
//!   turns driver callbacks into a stream consumed by one dispatcher
//! - [`DriverOptions`] - process-wide driver options
//! - [`MockDriver`] - an in-process driver for tests and demos
//!
//! # Design
//!
//! Session control mirrors the driver's own lifecycle:
//! - `configure()` applies options
//! - `register_notifications()` hands over the sink
//! - `open_session()` / `close_session()` attach to a controller
//! - `release_driver()` / `release_options()` free driver-global state
//!
//! Accessors are synchronous and may block on device I/O, so callers must
//! not hold locks the dispatcher needs while calling them.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod mock;
mod options;
mod sink;

pub use error::{DriverError, DriverResult};
pub use mock::{DriverCall, MockDriver, ValueDetails};
pub use options::{DriverOptions, LogLevel, OptionValue};
pub use sink::{notification_channel, NotificationSink, NotificationStream};

use zwave_sync_types::{NodeKey, NodeMetadata, ValueId};

/// The device-network driver as seen by the engine.
///
/// Implementations wrap the native stack. Every method may be called from
/// any thread.
pub trait DeviceDriver: Send + Sync {
    /// Apply process-wide options. Called once, before registration.
    fn configure(&self, options: &DriverOptions) -> DriverResult<()>;

    /// Start delivering notifications into `sink`, in arrival order.
    fn register_notifications(&self, sink: NotificationSink) -> DriverResult<()>;

    /// Stop delivering notifications and drop the sink.
    fn deregister_notifications(&self) -> DriverResult<()>;

    /// Attach to the controller at `path` (e.g. `/dev/ttyACM0`).
    ///
    /// Returns `false` if the driver refused.
    fn open_session(&self, path: &str) -> bool;

    /// Detach from the controller at `path`.
    ///
    /// Returns `false` if no such session was open.
    fn close_session(&self, path: &str) -> bool;

    /// Release the driver instance.
    fn release_driver(&self) -> DriverResult<()>;

    /// Release the process-wide options.
    fn release_options(&self) -> DriverResult<()>;

    /// Current value rendered as a string.
    fn value_as_string(&self, node: NodeKey, value: &ValueId) -> DriverResult<String>;

    /// Whether the value can only be read.
    fn is_value_read_only(&self, node: NodeKey, value: &ValueId) -> DriverResult<bool>;

    /// Whether the value can only be written.
    fn is_value_write_only(&self, node: NodeKey, value: &ValueId) -> DriverResult<bool>;

    /// Whether the device has reported the value at least once.
    fn is_value_set(&self, node: NodeKey, value: &ValueId) -> DriverResult<bool>;

    /// Whether the driver is polling the value.
    fn is_value_polled(&self, node: NodeKey, value: &ValueId) -> DriverResult<bool>;

    /// Label from the device database.
    fn value_label(&self, node: NodeKey, value: &ValueId) -> DriverResult<String>;

    /// Units label.
    fn value_units(&self, node: NodeKey, value: &ValueId) -> DriverResult<String>;

    /// Help text.
    fn value_help(&self, node: NodeKey, value: &ValueId) -> DriverResult<String>;

    /// Lower bound for numeric values.
    fn value_min(&self, node: NodeKey, value: &ValueId) -> DriverResult<i32>;

    /// Upper bound for numeric values.
    fn value_max(&self, node: NodeKey, value: &ValueId) -> DriverResult<i32>;

    /// Classification and naming fields for a node.
    fn node_metadata(&self, node: NodeKey) -> DriverResult<NodeMetadata>;

    /// The node's current user-assigned name.
    fn node_name(&self, node: NodeKey) -> DriverResult<String>;

    /// Rename a node. The driver reports the change with a NodeNaming
    /// notification.
    fn set_node_name(&self, node: NodeKey, name: &str) -> DriverResult<()>;
}
