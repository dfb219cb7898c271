//! Prediction trigger

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dispatch::DispatchError;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub device: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub result: String,
}

/// GET /start?device=COM7&model=rf
///
/// Blocks until the predictor exits (or is killed on timeout).
pub async fn start_prediction(
    State(state): State<AppState>,
    query: Result<Query<StartQuery>, QueryRejection>,
) -> ApiResult<Json<StartResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let device = query.device.as_deref().unwrap_or("");
    let model = query.model.as_deref().unwrap_or("");

    match state.dispatcher.dispatch(device, model).await {
        Ok(prediction) => Ok(Json(StartResponse {
            result: prediction.label,
        })),
        Err(e) => {
            if matches!(e, DispatchError::Validation(_) | DispatchError::NotFound(_)) {
                info!(device, model, reason = %e, "Prediction request rejected");
            }
            Err(e.into())
        }
    }
}
