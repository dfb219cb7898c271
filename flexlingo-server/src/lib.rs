//! flexlingo-server library
//!
//! Device discovery and prediction dispatch behind a small HTTP API:
//! - `GET /status`: is a serial device attached
//! - `GET /start`: run the predictor script against a device
//! - `GET /ports`: currently enumerated ports
//! - `GET /health`: liveness

use axum::Router;
use chrono::{DateTime, Utc};
use flexlingo_common::config::TomlConfig;
use flexlingo_common::DeviceId;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod dispatch;
pub mod error;
pub mod ports;
pub mod predictor;

pub use crate::error::{ApiError, ApiResult};

use crate::dispatch::Dispatcher;
use crate::ports::PortRegistry;
use crate::predictor::{Predictor, ProcessPredictor};
use flexlingo_common::config::ScriptsConfig;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Port enumeration, shared with the dispatcher
    pub registry: Arc<dyn PortRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    /// Device checked by `/status` when none is given
    pub default_device: DeviceId,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn PortRegistry>,
        predictor: Arc<dyn Predictor>,
        scripts: ScriptsConfig,
        default_device: DeviceId,
    ) -> Self {
        let dispatcher = Dispatcher::new(registry.clone(), predictor, scripts);
        Self {
            registry,
            dispatcher: Arc::new(dispatcher),
            default_device,
            startup_time: Utc::now(),
        }
    }

    /// Production state: configured registry plus the process predictor
    pub fn from_config(config: &TomlConfig) -> Self {
        Self::new(
            ports::registry_from_config(&config.ports),
            Arc::new(ProcessPredictor::from_config(&config.predictor)),
            config.predictor.scripts.clone(),
            config.server.default_device.clone(),
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/status", get(api::get_status))
        .route("/start", get(api::start_prediction))
        .route("/ports", get(api::list_ports))
        .merge(api::health_routes())
        .with_state(state)
        // The UI is served from a different origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
