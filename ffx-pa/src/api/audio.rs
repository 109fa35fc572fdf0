//! Text-to-speech endpoint
//!
//! POST /generate_audio returns the synthesized MP3 bytes directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

pub const MAX_TEXT_CHARS: usize = 4096;

#[derive(Debug, Deserialize)]
pub struct AudioRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
}

impl AudioRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let chars = self.text.trim().chars().count();
        if chars == 0 {
            return Err(ApiError::BadRequest("text must not be empty".to_string()));
        }
        if chars > MAX_TEXT_CHARS {
            return Err(ApiError::BadRequest(format!(
                "text exceeds {} characters",
                MAX_TEXT_CHARS
            )));
        }
        Ok(())
    }
}

/// POST /generate_audio
pub async fn generate_audio(
    State(state): State<AppState>,
    payload: Result<Json<AudioRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    request.validate()?;
    let tts = state
        .providers
        .tts
        .clone()
        .ok_or(ApiError::ProviderNotConfigured("OpenAI TTS"))?;

    let voice = request.voice.as_deref().filter(|v| !v.trim().is_empty());
    info!(chars = request.text.chars().count(), voice = ?voice, "Synthesizing audio");

    let audio = tts.synthesize(request.text.trim(), voice).await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

pub fn audio_routes() -> Router<AppState> {
    Router::new().route("/generate_audio", post(generate_audio))
}
