//! Health check and service index

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::services::ProviderStatus;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when SpeechAce and OpenAI are configured, "degraded" otherwise
    pub status: String,
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    pub uptime_seconds: u64,
    /// Which provider credentials are present
    pub providers: ProviderStatus,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let providers = state.providers.status();

    Json(HealthResponse {
        status: if providers.required_configured() { "ok" } else { "degraded" }.to_string(),
        module: "ffx-pa".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        providers,
    })
}

/// GET /
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Francoflex Pronunciation API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "pronunciation_analysis": "/pronunciation_analysis",
            "generate_questions": "/generate_questions",
            "generate_pair_exercise": "/generate_pair_exercise",
            "generate_audio": "/generate_audio",
            "health": "/health",
        }
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}
