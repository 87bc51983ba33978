//! Prometheus metrics endpoint.

use crate::manager::NodeManager;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use zwave_sync_driver::DeviceDriver;

/// Prometheus metrics handler.
///
/// Gauges describe the session now; counters are monotonic since startup.
pub async fn metrics_handler<D: DeviceDriver + 'static>(
    Extension(manager): Extension<NodeManager<D>>,
) -> impl IntoResponse {
    let m = manager.metrics();

    // Gauges
    let nodes = manager.node_count();
    let subscribers = manager.subscriber_count();
    let running = u8::from(manager.state().is_running());
    let query_complete = u8::from(manager.initial_query_complete());

    // Counters
    let notifications = m.notifications_total.load(Ordering::Relaxed);
    let dropped = m.notifications_dropped_total.load(Ordering::Relaxed);
    let errors = m.processing_errors_total.load(Ordering::Relaxed);
    let broadcasts = m.broadcasts_total.load(Ordering::Relaxed);
    let lagged = m.broadcasts_lagged_total.load(Ordering::Relaxed);
    let renames = m.renames_total.load(Ordering::Relaxed);
    let teardown_failures = m.teardown_failures_total.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP zwsync_nodes Nodes in the directory
# TYPE zwsync_nodes gauge
zwsync_nodes {nodes}

# HELP zwsync_subscribers Live broadcast subscriptions
# TYPE zwsync_subscribers gauge
zwsync_subscribers {subscribers}

# HELP zwsync_session_running Whether the driver session is running
# TYPE zwsync_session_running gauge
zwsync_session_running {running}

# HELP zwsync_initial_query_complete Whether the initial node query has finished
# TYPE zwsync_initial_query_complete gauge
zwsync_initial_query_complete {query_complete}

# HELP zwsync_info Server information
# TYPE zwsync_info gauge
zwsync_info{{version="{version}"}} 1

# HELP zwsync_notifications_total Notifications processed
# TYPE zwsync_notifications_total counter
zwsync_notifications_total {notifications}

# HELP zwsync_notifications_dropped_total Value notifications dropped for unknown nodes
# TYPE zwsync_notifications_dropped_total counter
zwsync_notifications_dropped_total {dropped}

# HELP zwsync_processing_errors_total Non-fatal notification processing errors
# TYPE zwsync_processing_errors_total counter
zwsync_processing_errors_total {errors}

# HELP zwsync_broadcasts_total Node updates broadcast
# TYPE zwsync_broadcasts_total counter
zwsync_broadcasts_total {broadcasts}

# HELP zwsync_broadcasts_lagged_total Node updates missed by lagging subscribers
# TYPE zwsync_broadcasts_lagged_total counter
zwsync_broadcasts_lagged_total {lagged}

# HELP zwsync_renames_total Node renames sent to the driver
# TYPE zwsync_renames_total counter
zwsync_renames_total {renames}

# HELP zwsync_teardown_failures_total Driver teardown steps that failed
# TYPE zwsync_teardown_failures_total counter
zwsync_teardown_failures_total {teardown_failures}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
