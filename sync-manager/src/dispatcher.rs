//! Applies driver notifications to the directory, one at a time.
//!
//! The dispatcher is the directory's only writer. It takes notifications in
//! arrival order, applies each one completely before looking at the next,
//! and publishes `"node-updated"` broadcasts for the changes clients care
//! about.
//!
//! Driver calls (metadata lookups and projections) run on the blocking pool
//! and never while the directory lock is held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use zwave_sync_core::{NodeDirectory, NodeRecord};
use zwave_sync_driver::DeviceDriver;
use zwave_sync_types::{BroadcastMessage, NodeKey, NodeMetadata, NotificationEvent};

use crate::config::BroadcastConfig;
use crate::error::{ProcessingError, ProcessingResult};
use crate::hub::BroadcastHub;
use crate::metrics::ManagerMetrics;
use crate::projector::SummaryProjector;

/// What handling a notification did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The directory changed (or the notification was only logged).
    Applied,
    /// Nothing changed.
    Unchanged,
    /// The notification referenced a node the directory does not hold.
    Dropped,
    /// The directory changed and this many updates were broadcast.
    Broadcast(usize),
}

/// Turns notifications into directory mutations and broadcasts.
#[derive(Debug)]
pub struct NotificationDispatcher<D> {
    driver: Arc<D>,
    directory: Arc<NodeDirectory>,
    projector: SummaryProjector<D>,
    hub: BroadcastHub,
    metrics: Arc<ManagerMetrics>,
    query_complete: Arc<AtomicBool>,
    policy: BroadcastConfig,
}

impl<D: DeviceDriver + 'static> NotificationDispatcher<D> {
    /// Create a dispatcher writing into `directory`.
    pub fn new(
        driver: Arc<D>,
        directory: Arc<NodeDirectory>,
        hub: BroadcastHub,
        metrics: Arc<ManagerMetrics>,
        query_complete: Arc<AtomicBool>,
        policy: BroadcastConfig,
    ) -> Self {
        Self {
            projector: SummaryProjector::new(Arc::clone(&driver)),
            driver,
            directory,
            hub,
            metrics,
            query_complete,
            policy,
        }
    }

    /// Whether the driver has reported the end of its initial node query.
    pub fn initial_query_complete(&self) -> bool {
        self.query_complete.load(Ordering::Acquire)
    }

    /// Handle one notification, absorbing errors the session survives.
    ///
    /// Returns `Err` only for errors that end the session.
    pub async fn dispatch(&self, event: NotificationEvent) -> ProcessingResult<Outcome> {
        let result = self.process(event).await;
        self.metrics
            .notifications_total
            .fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => {
                error!(error = %e, "fatal error processing notification");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "notification processing failed, continuing");
                self.metrics
                    .processing_errors_total
                    .fetch_add(1, Ordering::Relaxed);
                Ok(Outcome::Unchanged)
            }
        }
    }

    /// Handle one notification.
    pub async fn process(&self, event: NotificationEvent) -> ProcessingResult<Outcome> {
        let kind = event.kind();
        debug!(kind, node = ?event.node_key(), "processing notification");

        match event {
            NotificationEvent::NodeAdded { node } => self.node_added(kind, node).await,
            NotificationEvent::NodeRemoved { node } => Ok(self.node_removed(node)),
            NotificationEvent::NodeNaming { node } => self.node_naming(kind, node).await,
            NotificationEvent::ValueAdded { node, value }
            | NotificationEvent::ValueChanged { node, value } => {
                if !self.directory.upsert_value(&node, value) {
                    return Ok(self.drop_unknown(kind, node));
                }
                if self.policy.value_changes && self.initial_query_complete() {
                    let records = self.directory.get(&node).into_iter().collect();
                    return self.broadcast(kind, records).await;
                }
                Ok(Outcome::Applied)
            }
            NotificationEvent::ValueRemoved { node, value } => {
                if self.directory.remove_value(&node, value.key) {
                    Ok(Outcome::Applied)
                } else {
                    Ok(self.drop_unknown(kind, node))
                }
            }
            NotificationEvent::AwakeNodesQueried { .. }
            | NotificationEvent::AllNodesQueried { .. }
            | NotificationEvent::AllNodesQueriedSomeDead { .. } => {
                if !self.query_complete.swap(true, Ordering::AcqRel) {
                    info!(
                        kind,
                        nodes = self.directory.len(),
                        "initial node query complete"
                    );
                }
                if self.policy.query_complete {
                    return self.broadcast(kind, self.directory.snapshot()).await;
                }
                Ok(Outcome::Applied)
            }
            NotificationEvent::DriverReady { home_id } => {
                info!(home_id = format_args!("{home_id:#010x}"), "driver ready");
                Ok(Outcome::Applied)
            }
            NotificationEvent::DriverFailed { home_id } => {
                Err(ProcessingError::DriverFailed { home_id })
            }
        }
    }

    async fn node_added(&self, kind: &'static str, node: NodeKey) -> ProcessingResult<Outcome> {
        let driver = Arc::clone(&self.driver);
        let lookup = run_blocking(kind, move || driver.node_metadata(node))
            .await?;
        let metadata = match lookup {
            Ok(metadata) => metadata,
            Err(source) if source.is_session_loss() => {
                return Err(ProcessingError::Driver { kind, source });
            }
            Err(e) => {
                warn!(%node, error = %e, "node metadata unavailable, using defaults");
                NodeMetadata::default()
            }
        };

        let replaced = self.directory.upsert(NodeRecord::new(node, metadata));
        if replaced.is_some() {
            debug!(%node, "node added again, record replaced");
        } else {
            info!(%node, "node added");
        }
        Ok(Outcome::Applied)
    }

    fn node_removed(&self, node: NodeKey) -> Outcome {
        match self.directory.remove(&node) {
            Some(_) => {
                info!(%node, "node removed");
                Outcome::Applied
            }
            None => {
                debug!(%node, "removal of unknown node ignored");
                Outcome::Unchanged
            }
        }
    }

    async fn node_naming(&self, kind: &'static str, node: NodeKey) -> ProcessingResult<Outcome> {
        let Some(stored) = self.directory.get(&node) else {
            return Ok(self.drop_unknown(kind, node));
        };

        let driver = Arc::clone(&self.driver);
        let live = run_blocking(kind, move || driver.node_metadata(node))
            .await?
            .map_err(|source| ProcessingError::Driver { kind, source })?;

        let previous = &stored.metadata().name;
        if live.name == *previous {
            debug!(%node, name = %previous, "node name unchanged");
            return Ok(Outcome::Unchanged);
        }

        info!(%node, %previous, new = %live.name, "node renamed");
        self.directory.update_metadata(&node, live);
        let records = self.directory.get(&node).into_iter().collect();
        self.broadcast(kind, records).await
    }

    async fn broadcast(
        &self,
        kind: &'static str,
        records: Vec<NodeRecord>,
    ) -> ProcessingResult<Outcome> {
        let projector = self.projector.clone();
        let summaries = run_blocking(kind, move || projector.project_all(&records))
            .await?;

        let count = summaries.len();
        for summary in summaries {
            self.hub.publish(BroadcastMessage::node_updated(summary));
        }
        debug!(kind, count, "broadcast node updates");
        Ok(Outcome::Broadcast(count))
    }

    fn drop_unknown(&self, kind: &'static str, node: NodeKey) -> Outcome {
        warn!(kind, %node, "notification for unknown node dropped");
        self.metrics
            .notifications_dropped_total
            .fetch_add(1, Ordering::Relaxed);
        Outcome::Dropped
    }
}

/// Run a driver call on the blocking pool.
async fn run_blocking<T, F>(kind: &'static str, call: F) -> ProcessingResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| ProcessingError::Task {
            kind,
            reason: e.to_string(),
        })
}
