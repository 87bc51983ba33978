//! Request facade over a running session.
//!
//! Everything here runs concurrently with the dispatch loop. Reads take an
//! owned snapshot of the directory and project it on the blocking pool, so
//! slow driver accessors never hold the directory lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use zwave_sync_core::{DispatchState, NodeDirectory};
use zwave_sync_driver::{DeviceDriver, DriverResult};
use zwave_sync_types::{NodeKey, NodeSummary};

use crate::error::{LookupError, ManagerError, Result};
use crate::hub::{BroadcastHub, Subscription};
use crate::lifecycle::StateWatch;
use crate::metrics::ManagerMetrics;
use crate::projector::SummaryProjector;

/// Result of [`NodeManager::update_node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The driver was asked to rename the node.
    Renamed {
        /// Name before the request.
        previous: String,
        /// Requested name.
        new: String,
    },
    /// The requested name is already the node's name; nothing was sent.
    Unchanged,
}

/// Cheap-to-clone handle for request handlers.
#[derive(Debug)]
pub struct NodeManager<D> {
    driver: Arc<D>,
    directory: Arc<NodeDirectory>,
    projector: SummaryProjector<D>,
    hub: BroadcastHub,
    metrics: Arc<ManagerMetrics>,
    query_complete: Arc<AtomicBool>,
    state: StateWatch,
    started_at: Instant,
}

impl<D> Clone for NodeManager<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            directory: Arc::clone(&self.directory),
            projector: self.projector.clone(),
            hub: self.hub.clone(),
            metrics: Arc::clone(&self.metrics),
            query_complete: Arc::clone(&self.query_complete),
            state: self.state.clone(),
            started_at: self.started_at,
        }
    }
}

impl<D: DeviceDriver + 'static> NodeManager<D> {
    pub(crate) fn new(
        driver: Arc<D>,
        directory: Arc<NodeDirectory>,
        hub: BroadcastHub,
        metrics: Arc<ManagerMetrics>,
        query_complete: Arc<AtomicBool>,
        state: StateWatch,
        started_at: Instant,
    ) -> Self {
        Self {
            projector: SummaryProjector::new(Arc::clone(&driver)),
            driver,
            directory,
            hub,
            metrics,
            query_complete,
            state,
            started_at,
        }
    }

    /// Every node currently in the directory, in no particular order.
    pub async fn list_nodes(&self) -> Result<Vec<NodeSummary>> {
        let records = self.directory.snapshot();
        let projector = self.projector.clone();
        tokio::task::spawn_blocking(move || projector.project_all(&records))
            .await
            .map_err(|e| ManagerError::Task(e.to_string()))
    }

    /// One node, if the directory holds it.
    pub async fn node(&self, key: NodeKey) -> Result<Option<NodeSummary>> {
        let Some(record) = self.directory.get(&key) else {
            return Ok(None);
        };
        let projector = self.projector.clone();
        tokio::task::spawn_blocking(move || Some(projector.project(&record)))
            .await
            .map_err(|e| ManagerError::Task(e.to_string()))
    }

    /// Apply a client's edit of a node. Only the name is writable.
    ///
    /// The directory itself is not touched; the driver confirms a rename
    /// with a NodeNaming notification, which the dispatcher applies.
    ///
    /// # Errors
    ///
    /// [`LookupError::NodeNotFound`] if the directory does not hold the
    /// node (the driver is not called), or the driver's error.
    pub async fn update_node(&self, summary: &NodeSummary) -> Result<UpdateOutcome> {
        let node = summary.node_info_id;
        if !self.directory.contains(&node) {
            return Err(LookupError::NodeNotFound(node).into());
        }

        let driver = Arc::clone(&self.driver);
        let name = summary.node_name.clone();
        let outcome = tokio::task::spawn_blocking(move || rename(&*driver, node, name))
            .await
            .map_err(|e| ManagerError::Task(e.to_string()))??;

        if matches!(outcome, UpdateOutcome::Renamed { .. }) {
            self.metrics.renames_total.fetch_add(1, Ordering::Relaxed);
        }
        Ok(outcome)
    }

    /// Receive `"node-updated"` broadcasts from now on.
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    /// Whether the driver has finished its initial node query.
    pub fn initial_query_complete(&self) -> bool {
        self.query_complete.load(Ordering::Acquire)
    }

    /// Number of nodes in the directory.
    pub fn node_count(&self) -> usize {
        self.directory.len()
    }

    /// Number of live broadcast subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    /// Current session state.
    pub fn state(&self) -> DispatchState {
        self.state.current()
    }

    /// Session counters.
    pub fn metrics(&self) -> &ManagerMetrics {
        &self.metrics
    }

    /// Time since the controller was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

fn rename<D: DeviceDriver + ?Sized>(
    driver: &D,
    node: NodeKey,
    name: String,
) -> DriverResult<UpdateOutcome> {
    let previous = driver.node_name(node)?;
    if previous == name {
        warn!(%node, %name, "node already has this name, not renaming");
        return Ok(UpdateOutcome::Unchanged);
    }

    info!(%node, %previous, new = %name, "renaming node");
    driver.set_node_name(node, &name)?;
    Ok(UpdateOutcome::Renamed {
        previous,
        new: name,
    })
}
