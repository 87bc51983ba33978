//! Operational counters for a session.

use std::sync::atomic::AtomicU64;

/// Operational metrics for monitoring notification processing.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct ManagerMetrics {
    /// Notifications fully handled, successfully or not.
    pub notifications_total: AtomicU64,
    /// Value notifications dropped because their node is unknown.
    pub notifications_dropped_total: AtomicU64,
    /// Non-fatal processing errors.
    pub processing_errors_total: AtomicU64,
    /// Broadcast messages published.
    pub broadcasts_total: AtomicU64,
    /// Broadcast messages subscribers missed by lagging.
    pub broadcasts_lagged_total: AtomicU64,
    /// Renames issued to the driver.
    pub renames_total: AtomicU64,
    /// Teardown steps that failed.
    pub teardown_failures_total: AtomicU64,
}
