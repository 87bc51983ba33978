//! Health check endpoint.

use crate::manager::NodeManager;
use axum::{Extension, Json};
use serde::Serialize;
use zwave_sync_driver::DeviceDriver;

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status: "ok" while the session runs, otherwise the state.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Lifecycle state label.
    pub state: String,
    /// Nodes in the directory.
    pub nodes: usize,
    /// Live broadcast subscriptions.
    pub subscribers: usize,
    /// Whether the driver finished its initial node query.
    pub initial_query_complete: bool,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler<D: DeviceDriver + 'static>(
    Extension(manager): Extension<NodeManager<D>>,
) -> Json<HealthStatus> {
    let state = manager.state();
    let status = if state.is_running() { "ok" } else { state.label() };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        state: state.label().to_string(),
        nodes: manager.node_count(),
        subscribers: manager.subscriber_count(),
        initial_query_complete: manager.initial_query_complete(),
        uptime_seconds: manager.uptime().as_secs(),
    })
}
