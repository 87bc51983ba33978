//! Mock driver for testing.
//!
//! Holds node and value metadata in memory, records every call it receives,
//! lets tests inject notifications and force individual operations to fail.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::warn;
use zwave_sync_types::{NodeKey, NodeMetadata, NotificationEvent, ValueId, ValueKey};

use crate::{DeviceDriver, DriverError, DriverOptions, DriverResult, NotificationSink};

/// A call received by the [`MockDriver`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    /// `configure`
    Configure,
    /// `register_notifications`
    RegisterNotifications,
    /// `deregister_notifications`
    DeregisterNotifications,
    /// `open_session`
    OpenSession(String),
    /// `close_session`
    CloseSession(String),
    /// `release_driver`
    ReleaseDriver,
    /// `release_options`
    ReleaseOptions,
    /// Any per-value accessor.
    ValueQuery(NodeKey, ValueKey),
    /// `node_metadata` or `node_name`
    NodeQuery(NodeKey),
    /// `set_node_name`
    SetNodeName(NodeKey, String),
}

impl DriverCall {
    /// Whether this call is part of session teardown.
    pub fn is_teardown(&self) -> bool {
        matches!(
            self,
            Self::CloseSession(_)
                | Self::DeregisterNotifications
                | Self::ReleaseDriver
                | Self::ReleaseOptions
        )
    }
}

/// Live fields the mock reports for a value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueDetails {
    /// Read-only flag.
    pub read_only: bool,
    /// Write-only flag.
    pub write_only: bool,
    /// Set flag.
    pub set: bool,
    /// Polled flag.
    pub polled: bool,
    /// Label.
    pub label: String,
    /// Units.
    pub units: String,
    /// Help text.
    pub help: String,
    /// Lower bound.
    pub min: i32,
    /// Upper bound.
    pub max: i32,
    /// String form of the current value.
    pub as_string: String,
}

/// Mock driver for testing.
///
/// Cloning shares state, so a test can keep one handle while the engine owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct MockDriver {
    inner: Arc<Mutex<MockDriverInner>>,
}

#[derive(Debug, Default)]
struct MockDriverInner {
    options: Option<DriverOptions>,
    sink: Option<NotificationSink>,
    open_sessions: HashSet<String>,
    nodes: HashMap<NodeKey, NodeMetadata>,
    values: HashMap<(NodeKey, ValueKey), ValueDetails>,
    calls: Vec<DriverCall>,
    fail_next_configure: Option<String>,
    fail_next_registration: Option<String>,
    fail_next_deregistration: Option<String>,
    fail_next_release: Option<String>,
    refuse_next_session: bool,
    fail_next_close: bool,
    fail_value_queries: bool,
    session_lost: bool,
    close_delay: Option<Duration>,
    callback_threads: Vec<JoinHandle<()>>,
    lost_notifications: u64,
}

impl MockDriver {
    /// Create a new mock driver with no nodes.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockDriverInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the metadata the driver reports for a node, without notifying.
    pub fn set_node_metadata(&self, node: NodeKey, metadata: NodeMetadata) {
        self.lock().nodes.insert(node, metadata);
    }

    /// Set the live fields the driver reports for a value.
    pub fn set_value_details(&self, node: NodeKey, value: ValueKey, details: ValueDetails) {
        self.lock().values.insert((node, value), details);
    }

    /// Push a notification into the registered sink, waiting for room.
    pub async fn emit(&self, event: NotificationEvent) -> DriverResult<()> {
        let sink = self.lock().sink.clone().ok_or(DriverError::QueueClosed)?;
        sink.send(event).await
    }

    /// The sink handed over on registration, if still registered.
    pub fn sink(&self) -> Option<NotificationSink> {
        self.lock().sink.clone()
    }

    /// Whether notifications are currently registered.
    pub fn is_registered(&self) -> bool {
        self.lock().sink.is_some()
    }

    /// Options passed to the last successful `configure`.
    pub fn options(&self) -> Option<DriverOptions> {
        self.lock().options.clone()
    }

    /// Paths with an open session.
    pub fn open_sessions(&self) -> Vec<String> {
        let mut sessions: Vec<_> = self.lock().open_sessions.iter().cloned().collect();
        sessions.sort();
        sessions
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    /// Only the teardown calls, in order.
    pub fn teardown_calls(&self) -> Vec<DriverCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_teardown())
            .cloned()
            .collect()
    }

    /// Hand over a thread that delivers notifications the way a native
    /// callback thread does. `close_session` joins it before returning.
    pub fn attach_callback_thread(&self, thread: JoinHandle<()>) {
        self.lock().callback_threads.push(thread);
    }

    /// Notifications the driver raised itself that never reached the queue.
    pub fn lost_notifications(&self) -> u64 {
        self.lock().lost_notifications
    }

    /// Know `node` with default metadata unless it is already described.
    pub fn ensure_node(&self, node: NodeKey) {
        self.lock().nodes.entry(node).or_default();
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Cause the next `configure()` to fail with the given error.
    pub fn fail_next_configure(&self, error: &str) {
        self.lock().fail_next_configure = Some(error.to_string());
    }

    /// Cause the next `register_notifications()` to fail.
    pub fn fail_next_registration(&self, error: &str) {
        self.lock().fail_next_registration = Some(error.to_string());
    }

    /// Cause the next `deregister_notifications()` to fail.
    pub fn fail_next_deregistration(&self, error: &str) {
        self.lock().fail_next_deregistration = Some(error.to_string());
    }

    /// Cause the next `release_driver()` to fail.
    pub fn fail_next_release(&self, error: &str) {
        self.lock().fail_next_release = Some(error.to_string());
    }

    /// Cause the next `open_session()` to return `false`.
    pub fn refuse_next_session(&self) {
        self.lock().refuse_next_session = true;
    }

    /// Cause the next `close_session()` to return `false`.
    pub fn fail_next_close(&self) {
        self.lock().fail_next_close = true;
    }

    /// Make every value accessor fail until turned off again.
    pub fn fail_value_queries(&self, fail: bool) {
        self.lock().fail_value_queries = fail;
    }

    /// Make every accessor report [`DriverError::SessionLost`].
    pub fn lose_session(&self) {
        self.lock().session_lost = true;
    }

    /// Make `close_session()` block for `delay` before returning.
    pub fn delay_close(&self, delay: Duration) {
        self.lock().close_delay = Some(delay);
    }

    fn value_details(&self, node: NodeKey, value: &ValueId) -> DriverResult<ValueDetails> {
        let mut inner = self.lock();
        inner.calls.push(DriverCall::ValueQuery(node, value.key));
        if inner.session_lost {
            return Err(DriverError::SessionLost);
        }
        if inner.fail_value_queries {
            return Err(DriverError::ValueNotFound {
                node,
                value: value.key,
            });
        }
        // Values the test never described report defaults, like a driver
        // that has not read the device database yet.
        Ok(inner
            .values
            .get(&(node, value.key))
            .cloned()
            .unwrap_or_default())
    }

    fn node_entry(&self, node: NodeKey) -> DriverResult<NodeMetadata> {
        let mut inner = self.lock();
        inner.calls.push(DriverCall::NodeQuery(node));
        if inner.session_lost {
            return Err(DriverError::SessionLost);
        }
        inner
            .nodes
            .get(&node)
            .cloned()
            .ok_or(DriverError::NodeNotFound(node))
    }
}

impl DeviceDriver for MockDriver {
    fn configure(&self, options: &DriverOptions) -> DriverResult<()> {
        let mut inner = self.lock();
        inner.calls.push(DriverCall::Configure);
        if let Some(error) = inner.fail_next_configure.take() {
            return Err(DriverError::Rejected(error));
        }
        inner.options = Some(options.clone());
        Ok(())
    }

    fn register_notifications(&self, sink: NotificationSink) -> DriverResult<()> {
        let mut inner = self.lock();
        inner.calls.push(DriverCall::RegisterNotifications);
        if let Some(error) = inner.fail_next_registration.take() {
            return Err(DriverError::Registration(error));
        }
        inner.sink = Some(sink);
        Ok(())
    }

    fn deregister_notifications(&self) -> DriverResult<()> {
        let mut inner = self.lock();
        inner.calls.push(DriverCall::DeregisterNotifications);
        if let Some(error) = inner.fail_next_deregistration.take() {
            return Err(DriverError::Registration(error));
        }
        inner.sink = None;
        Ok(())
    }

    fn open_session(&self, path: &str) -> bool {
        let mut inner = self.lock();
        inner.calls.push(DriverCall::OpenSession(path.to_string()));
        if std::mem::take(&mut inner.refuse_next_session) {
            return false;
        }
        inner.open_sessions.insert(path.to_string());
        true
    }

    fn close_session(&self, path: &str) -> bool {
        let (delay, threads) = {
            let mut inner = self.lock();
            inner.calls.push(DriverCall::CloseSession(path.to_string()));
            (inner.close_delay, std::mem::take(&mut inner.callback_threads))
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let mut joined = true;
        for thread in threads {
            joined &= thread.join().is_ok();
        }

        let mut inner = self.lock();
        if std::mem::take(&mut inner.fail_next_close) || !joined {
            return false;
        }
        inner.open_sessions.remove(path)
    }

    fn release_driver(&self) -> DriverResult<()> {
        let mut inner = self.lock();
        inner.calls.push(DriverCall::ReleaseDriver);
        match inner.fail_next_release.take() {
            Some(error) => Err(DriverError::Rejected(error)),
            None => Ok(()),
        }
    }

    fn release_options(&self) -> DriverResult<()> {
        let mut inner = self.lock();
        inner.calls.push(DriverCall::ReleaseOptions);
        inner.options = None;
        Ok(())
    }

    fn value_as_string(&self, node: NodeKey, value: &ValueId) -> DriverResult<String> {
        Ok(self.value_details(node, value)?.as_string)
    }

    fn is_value_read_only(&self, node: NodeKey, value: &ValueId) -> DriverResult<bool> {
        Ok(self.value_details(node, value)?.read_only)
    }

    fn is_value_write_only(&self, node: NodeKey, value: &ValueId) -> DriverResult<bool> {
        Ok(self.value_details(node, value)?.write_only)
    }

    fn is_value_set(&self, node: NodeKey, value: &ValueId) -> DriverResult<bool> {
        Ok(self.value_details(node, value)?.set)
    }

    fn is_value_polled(&self, node: NodeKey, value: &ValueId) -> DriverResult<bool> {
        Ok(self.value_details(node, value)?.polled)
    }

    fn value_label(&self, node: NodeKey, value: &ValueId) -> DriverResult<String> {
        Ok(self.value_details(node, value)?.label)
    }

    fn value_units(&self, node: NodeKey, value: &ValueId) -> DriverResult<String> {
        Ok(self.value_details(node, value)?.units)
    }

    fn value_help(&self, node: NodeKey, value: &ValueId) -> DriverResult<String> {
        Ok(self.value_details(node, value)?.help)
    }

    fn value_min(&self, node: NodeKey, value: &ValueId) -> DriverResult<i32> {
        Ok(self.value_details(node, value)?.min)
    }

    fn value_max(&self, node: NodeKey, value: &ValueId) -> DriverResult<i32> {
        Ok(self.value_details(node, value)?.max)
    }

    fn node_metadata(&self, node: NodeKey) -> DriverResult<NodeMetadata> {
        self.node_entry(node)
    }

    fn node_name(&self, node: NodeKey) -> DriverResult<String> {
        Ok(self.node_entry(node)?.name)
    }

    fn set_node_name(&self, node: NodeKey, name: &str) -> DriverResult<()> {
        let mut inner = self.lock();
        inner
            .calls
            .push(DriverCall::SetNodeName(node, name.to_string()));
        if inner.session_lost {
            return Err(DriverError::SessionLost);
        }
        let metadata = inner
            .nodes
            .get_mut(&node)
            .ok_or(DriverError::NodeNotFound(node))?;
        metadata.name = name.to_string();

        // A real driver confirms renames asynchronously.
        let confirmed = match &inner.sink {
            Some(sink) => sink.try_send(NotificationEvent::NodeNaming { node }),
            None => Err(DriverError::QueueClosed),
        };
        if let Err(e) = confirmed {
            warn!(%node, error = %e, "rename confirmation not delivered");
            inner.lost_notifications += 1;
        }
        Ok(())
    }
}
