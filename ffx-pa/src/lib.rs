//! ffx-pa library interface
//!
//! Exposes the router and state so integration tests can drive the service
//! without binding a socket.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::config::ServiceConfig;
use crate::services::Providers;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
///
/// Read-only after startup; requests share nothing else.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub providers: Providers,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServiceConfig, providers: Providers) -> Self {
        Self {
            config: Arc::new(config),
            providers,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    // The React frontend is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::health_routes())
        .merge(api::analysis_routes())
        .merge(api::practice_routes())
        .merge(api::audio_routes())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
