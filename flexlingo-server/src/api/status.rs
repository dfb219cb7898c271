//! Device connection status
//!
//! Polled by the UI every few seconds to drive its "device connected" badge.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use flexlingo_common::DeviceId;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::ports;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Device to check; the configured default when absent or blank
    pub device: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connected: bool,
}

/// GET /status?device=COM7
pub async fn get_status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let device = query
        .device
        .as_deref()
        .map(DeviceId::new)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| state.default_device.clone());

    let connected = ports::is_connected(state.registry.as_ref(), &device)
        .await
        .map_err(|e| {
            error!(device = %device, error = %e, "Status check failed");
            ApiError::from(e)
        })?;

    Ok(Json(StatusResponse { connected }))
}
