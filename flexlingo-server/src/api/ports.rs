//! Enumerated serial ports, for the UI's device picker

use axum::{extract::State, Json};
use flexlingo_common::{DeviceId, PortDescriptor};
use serde::Serialize;
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::ports;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PortEntry {
    /// Normalized id, usable as `device=` on the other endpoints
    pub id: DeviceId,
    pub descriptor: PortDescriptor,
}

#[derive(Debug, Serialize)]
pub struct PortsResponse {
    pub ports: Vec<PortEntry>,
}

/// GET /ports
pub async fn list_ports(State(state): State<AppState>) -> ApiResult<Json<PortsResponse>> {
    let descriptors = ports::list_ports(state.registry.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Port listing failed");
            ApiError::from(e)
        })?;

    let ports = descriptors
        .into_iter()
        .map(|descriptor| PortEntry {
            id: ports::normalize(&descriptor),
            descriptor,
        })
        .filter(|entry| !entry.id.is_empty())
        .collect();

    Ok(Json(PortsResponse { ports }))
}
