//! HTTP endpoints for zwave-sync.
//!
//! Provides health checks, metrics and the node list/update requests.

pub mod health;
mod metrics;
mod nodes;

use crate::manager::NodeManager;
use axum::{routing::get, Extension, Router};
use zwave_sync_driver::DeviceDriver;

pub use health::HealthStatus;
pub use nodes::UpdateResponse;

/// Build the HTTP router with all endpoints.
pub fn build_router<D: DeviceDriver + 'static>(manager: NodeManager<D>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler::<D>))
        .route("/metrics", get(metrics::metrics_handler::<D>))
        .route(
            "/nodes",
            get(nodes::list_handler::<D>).put(nodes::update_handler::<D>),
        )
        .route("/nodes/:id", get(nodes::get_handler::<D>))
        .layer(Extension(manager))
}
