//! Node list and update endpoints.

use crate::error::ManagerError;
use crate::manager::{NodeManager, UpdateOutcome};
use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use tracing::warn;
use zwave_sync_driver::{DeviceDriver, DriverError};
use zwave_sync_types::{NodeKey, NodeSummary};

/// Body returned by `PUT /nodes`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResponse {
    /// The node the request named.
    pub node_info_id: NodeKey,
    /// "renamed" or "unchanged".
    pub result: &'static str,
}

/// `GET /nodes`
pub async fn list_handler<D: DeviceDriver + 'static>(
    Extension(manager): Extension<NodeManager<D>>,
) -> Result<Json<Vec<NodeSummary>>, ManagerError> {
    Ok(Json(manager.list_nodes().await?))
}

/// `GET /nodes/:id`
pub async fn get_handler<D: DeviceDriver + 'static>(
    Extension(manager): Extension<NodeManager<D>>,
    Path(id): Path<String>,
) -> Response {
    let key = match id.parse::<NodeKey>() {
        Ok(key) => key,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    match manager.node(key).await {
        Ok(Some(summary)) => Json(summary).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("node not found: {key}")),
        Err(e) => e.into_response(),
    }
}

/// `PUT /nodes`
pub async fn update_handler<D: DeviceDriver + 'static>(
    Extension(manager): Extension<NodeManager<D>>,
    Json(summary): Json<NodeSummary>,
) -> Result<Json<UpdateResponse>, ManagerError> {
    let outcome = manager.update_node(&summary).await?;
    Ok(Json(UpdateResponse {
        node_info_id: summary.node_info_id,
        result: match outcome {
            UpdateOutcome::Renamed { .. } => "renamed",
            UpdateOutcome::Unchanged => "unchanged",
        },
    }))
}

impl IntoResponse for ManagerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ManagerError::Lookup(_) => StatusCode::NOT_FOUND,
            ManagerError::Driver(DriverError::NodeNotFound(_)) => StatusCode::NOT_FOUND,
            ManagerError::Driver(e) if e.is_session_loss() => StatusCode::SERVICE_UNAVAILABLE,
            ManagerError::NotRunning(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        error_response(status, self.to_string())
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
