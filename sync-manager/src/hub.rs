//! Fan-out of node updates to subscribers.
//!
//! Publishing never waits for subscribers. Each subscriber has a bounded
//! backlog; one that falls behind loses its oldest messages and is told how
//! many it missed, so a slow client can never stall the dispatcher.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};
use zwave_sync_types::BroadcastMessage;

use crate::metrics::ManagerMetrics;

/// Publisher side, owned by the dispatcher and shared with the facade.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<BroadcastMessage>,
    metrics: Arc<ManagerMetrics>,
}

impl BroadcastHub {
    /// Create a hub buffering up to `capacity` messages per subscriber.
    pub fn new(capacity: usize, metrics: Arc<ManagerMetrics>) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, metrics }
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, message: BroadcastMessage) -> usize {
        self.metrics.broadcasts_total.fetch_add(1, Ordering::Relaxed);
        let node = message.payload.node_info_id;
        match self.tx.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(%node, "no subscribers for broadcast");
                0
            }
        }
    }

    /// Start receiving messages published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            metrics: Arc::clone(&self.metrics),
            missed: 0,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One subscriber's view of the broadcast feed.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<BroadcastMessage>,
    metrics: Arc<ManagerMetrics>,
    missed: u64,
}

impl Subscription {
    /// The next message, skipping over any this subscriber lagged past.
    ///
    /// Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<BroadcastMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The next message if one is already waiting.
    pub fn try_recv(&mut self) -> Option<BroadcastMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Messages this subscriber has missed so far.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    fn record_lag(&mut self, skipped: u64) {
        warn!(skipped, "subscriber lagged, oldest updates dropped");
        self.missed += skipped;
        self.metrics
            .broadcasts_lagged_total
            .fetch_add(skipped, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zwave_sync_types::{NodeKey, NodeMetadata, NodeSummary};

    fn update(node: u8) -> BroadcastMessage {
        BroadcastMessage::node_updated(NodeSummary::from_metadata(
            NodeKey::new(1, node),
            &NodeMetadata::default(),
        ))
    }

    fn hub(capacity: usize) -> BroadcastHub {
        BroadcastHub::new(capacity, Arc::new(ManagerMetrics::default()))
    }

    #[tokio::test]
    async fn every_subscriber_receives() {
        let hub = hub(4);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.publish(update(5)), 2);
        assert_eq!(a.recv().await, Some(update(5)));
        assert_eq!(b.recv().await, Some(update(5)));
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let hub = hub(4);
        assert_eq!(hub.publish(update(5)), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn slow_subscriber_skips_oldest() {
        let metrics = Arc::new(ManagerMetrics::default());
        let hub = BroadcastHub::new(2, Arc::clone(&metrics));
        let mut slow = hub.subscribe();

        for node in 1..=5 {
            hub.publish(update(node));
        }

        assert_eq!(slow.try_recv(), Some(update(4)));
        assert_eq!(slow.try_recv(), Some(update(5)));
        assert_eq!(slow.try_recv(), None);
        assert_eq!(slow.missed(), 3);
        assert_eq!(metrics.broadcasts_lagged_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.broadcasts_total.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn recv_ends_when_hub_dropped() {
        let hub = hub(2);
        let mut sub = hub.subscribe();
        drop(hub);
        assert_eq!(sub.recv().await, None);
    }
}
