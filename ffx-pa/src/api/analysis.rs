//! Pronunciation analysis endpoint
//!
//! POST /pronunciation_analysis (multipart form)
//! - `audio_file` (required): recording of the learner
//! - `target_text` (required): sentence the learner read
//! - `lv1`, `lv2`, `user_id` (optional): echoed in metadata
//! - `feedback` (optional, default true): request coaching text
//! - `reference_audio` (optional, default false): synthesize the target text
//!
//! Input is validated before any outbound call. Once the scoring result is
//! normalized, feedback and reference audio run concurrently; failure of
//! either leaves the scoring result intact.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{FeedbackOutcome, PhoneSummary, PronunciationResult, UnavailableReason};
use crate::services::speechace_client::API_VERSION;
use crate::services::{
    generate_feedback, group_by_phone, normalize, ScoringRequest, SpeechSynthesizer,
};
use crate::{ApiError, ApiResult, AppState};

const DEFAULT_FILE_NAME: &str = "recording.wav";
const REFERENCE_AUDIO_TYPE: &str = "audio/mpeg";

/// Raw multipart fields
#[derive(Debug, Default)]
pub struct AnalysisForm {
    pub audio: Option<Vec<u8>>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub target_text: Option<String>,
    pub lv1: Option<String>,
    pub lv2: Option<String>,
    pub user_id: Option<String>,
    pub feedback: Option<bool>,
    pub reference_audio: Option<bool>,
}

/// Per-request switches and echo fields
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub feedback: bool,
    pub reference_audio: bool,
    pub lv1: Option<String>,
    pub lv2: Option<String>,
    pub user_id: Option<String>,
}

fn parse_flag(name: &str, value: &str) -> ApiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ApiError::BadRequest(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AnalysisForm {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = AnalysisForm::default();
        let invalid = |e: axum::extract::multipart::MultipartError| {
            ApiError::BadRequest(format!("Invalid multipart body: {}", e))
        };

        while let Some(field) = multipart.next_field().await.map_err(invalid)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "audio_file" => {
                    form.file_name = field.file_name().map(str::to_string);
                    form.content_type = field.content_type().map(str::to_string);
                    form.audio = Some(field.bytes().await.map_err(invalid)?.to_vec());
                }
                "target_text" => form.target_text = Some(field.text().await.map_err(invalid)?),
                "lv1" => form.lv1 = Some(field.text().await.map_err(invalid)?),
                "lv2" => form.lv2 = Some(field.text().await.map_err(invalid)?),
                "user_id" => form.user_id = Some(field.text().await.map_err(invalid)?),
                "feedback" => {
                    form.feedback = Some(parse_flag(&name, &field.text().await.map_err(invalid)?)?)
                }
                "reference_audio" => {
                    form.reference_audio =
                        Some(parse_flag(&name, &field.text().await.map_err(invalid)?)?)
                }
                other => debug!(field = %other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    /// Reject empty audio or blank target text
    pub fn validate(self) -> ApiResult<(ScoringRequest, AnalysisOptions)> {
        let audio = self
            .audio
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ApiError::BadRequest("audio_file is required and must not be empty".to_string()))?;

        let target_text = self
            .target_text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::BadRequest("target_text is required and must not be blank".to_string()))?;

        let request = ScoringRequest {
            audio,
            file_name: non_blank(self.file_name).unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
            content_type: self.content_type,
            target_text,
        };

        let options = AnalysisOptions {
            feedback: self.feedback.unwrap_or(true),
            reference_audio: self.reference_audio.unwrap_or(false),
            lv1: non_blank(self.lv1),
            lv2: non_blank(self.lv2),
            user_id: non_blank(self.user_id),
        };

        Ok((request, options))
    }
}

/// Synthesized reading of the target text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReferenceAudio {
    Available {
        content_type: String,
        audio_base64: String,
    },
    Unavailable {
        reason: UnavailableReason,
        message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct AnalysisMetadata {
    pub request_id: Uuid,
    pub status: String,
    pub api_version: &'static str,
    pub target_text: String,
    pub user_id: Option<String>,
    pub lv1: Option<String>,
    pub lv2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_api_response: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub result: PronunciationResult,
    pub phone_summary: Vec<PhoneSummary>,
    pub feedback: FeedbackOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_audio: Option<ReferenceAudio>,
    pub metadata: AnalysisMetadata,
}

/// Synthesize `text`, bounded by `timeout`, never failing the caller
pub async fn reference_audio(
    tts: Option<&dyn SpeechSynthesizer>,
    text: &str,
    timeout: Duration,
) -> ReferenceAudio {
    let Some(tts) = tts else {
        return ReferenceAudio::Unavailable {
            reason: UnavailableReason::NotConfigured,
            message: "Speech synthesis is not configured".to_string(),
        };
    };

    match tokio::time::timeout(timeout, tts.synthesize(text, None)).await {
        Ok(Ok(audio)) => ReferenceAudio::Available {
            content_type: REFERENCE_AUDIO_TYPE.to_string(),
            audio_base64: base64::engine::general_purpose::STANDARD.encode(audio),
        },
        Ok(Err(e)) => {
            warn!(error = %e, "Reference audio synthesis failed");
            ReferenceAudio::Unavailable {
                reason: if e.is_timeout() {
                    UnavailableReason::Timeout
                } else {
                    UnavailableReason::ProviderError
                },
                message: e.to_string(),
            }
        }
        Err(_) => {
            warn!(timeout = ?timeout, "Reference audio synthesis timed out");
            ReferenceAudio::Unavailable {
                reason: UnavailableReason::Timeout,
                message: format!("No audio within {}s", timeout.as_secs_f32()),
            }
        }
    }
}

/// POST /pronunciation_analysis
pub async fn pronunciation_analysis(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalysisResponse>> {
    let request_id = Uuid::new_v4();
    let (request, options) = AnalysisForm::read(multipart).await?.validate()?;

    let scoring = state
        .providers
        .scoring
        .clone()
        .ok_or(ApiError::ProviderNotConfigured("SpeechAce"))?;

    info!(
        request_id = %request_id,
        audio_bytes = request.audio.len(),
        target_text = %request.target_text,
        "Scoring pronunciation"
    );

    let raw = scoring.score(&request).await?;
    let result = normalize(&raw, &request.target_text, &state.config.cefr_bands)?;
    let groups = group_by_phone(&result);

    let feedback = async {
        if options.feedback {
            generate_feedback(
                state.providers.llm.as_deref(),
                &result,
                &groups,
                &state.config.feedback,
            )
            .await
        } else {
            FeedbackOutcome::Skipped
        }
    };

    let audio = async {
        if options.reference_audio {
            Some(
                reference_audio(
                    state.providers.tts.as_deref(),
                    &request.target_text,
                    state.config.timeouts.tts,
                )
                .await,
            )
        } else {
            None
        }
    };

    let (feedback, reference_audio) = tokio::join!(feedback, audio);

    info!(
        request_id = %request_id,
        overall_score = result.overall_score,
        cefr_level = %result.cefr_level,
        feedback_available = feedback.is_available(),
        "Pronunciation analysis complete"
    );

    let metadata = AnalysisMetadata {
        request_id,
        status: result
            .provider_status
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        api_version: API_VERSION,
        target_text: request.target_text.clone(),
        user_id: options.user_id,
        lv1: options.lv1,
        lv2: options.lv2,
        raw_api_response: state.config.include_raw_response.then_some(raw),
    };

    Ok(Json(AnalysisResponse {
        phone_summary: groups.summaries(),
        result,
        feedback,
        reference_audio,
        metadata,
    }))
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new().route("/pronunciation_analysis", post(pronunciation_analysis))
}
