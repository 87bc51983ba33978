//! Bounded, ordered notification queue between the driver and the dispatcher.
//!
//! Native drivers deliver notifications through callbacks on their own
//! threads. The driver side holds a [`NotificationSink`] and pushes into it;
//! the dispatcher is the only holder of the [`NotificationStream`]. The queue
//! is bounded and never drops: a full queue makes the sender wait, which
//! pushes back on the driver instead of losing state changes.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use zwave_sync_types::NotificationEvent;

use crate::{DriverError, DriverResult};

/// Create a notification queue holding at most `capacity` pending events.
///
/// A capacity of zero is treated as one.
pub fn notification_channel(capacity: usize) -> (NotificationSink, NotificationStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (NotificationSink { tx }, NotificationStream { rx })
}

/// Producer half, handed to the driver on registration.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: mpsc::Sender<NotificationEvent>,
}

impl NotificationSink {
    /// Enqueue a notification, waiting for room.
    pub async fn send(&self, event: NotificationEvent) -> DriverResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| DriverError::QueueClosed)
    }

    /// Enqueue from a non-async thread (a native callback), blocking for room.
    ///
    /// Must not be called from inside an async task.
    pub fn blocking_send(&self, event: NotificationEvent) -> DriverResult<()> {
        self.tx
            .blocking_send(event)
            .map_err(|_| DriverError::QueueClosed)
    }

    /// Enqueue without waiting.
    pub fn try_send(&self, event: NotificationEvent) -> DriverResult<()> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DriverError::QueueFull,
            TrySendError::Closed(_) => DriverError::QueueClosed,
        })
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the dispatcher loop.
#[derive(Debug)]
pub struct NotificationStream {
    rx: mpsc::Receiver<NotificationEvent>,
}

impl NotificationStream {
    /// The next notification in arrival order.
    ///
    /// Returns `None` once every sink has been dropped and the queue drained.
    pub async fn next(&mut self) -> Option<NotificationEvent> {
        self.rx.recv().await
    }

    /// Stop accepting new notifications; queued ones can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
