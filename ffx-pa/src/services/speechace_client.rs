//! SpeechAce scoring API client
//!
//! Posts the learner's audio and the target sentence as multipart form data
//! and hands back the untouched JSON payload for the normalizer.

use crate::services::provider::{ProviderError, ScoringProvider, ScoringRequest};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

const PROVIDER: &str = "SpeechAce";
const SCORING_PATH: &str = "/api/scoring/text/v9/json";
const USER_AGENT: &str = concat!("Francoflex/", env!("CARGO_PKG_VERSION"));

/// Scoring API version reported in response metadata
pub const API_VERSION: &str = "v9";

/// SpeechAce API client
pub struct SpeechAceClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    dialect: String,
    timeout_secs: u64,
}

impl SpeechAceClient {
    pub fn new(
        api_key: String,
        base_url: &str,
        dialect: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            dialect: dialect.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn scoring_url(&self) -> String {
        format!("{}{}", self.base_url, SCORING_PATH)
    }
}

/// The payload's `status` field, "unknown" when absent
fn provider_status(body: &Value) -> &str {
    body.get("status").and_then(Value::as_str).unwrap_or("unknown")
}

/// SpeechAce reports failures as HTTP 200 with `"status": "error"`
fn check_provider_status(body: &Value) -> Result<(), ProviderError> {
    if body.get("status").and_then(Value::as_str) != Some("error") {
        return Ok(());
    }

    let short = body
        .get("short_message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let detail = body
        .get("detail_message")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Err(ProviderError::Api {
        provider: PROVIDER,
        status: 200,
        body: if detail.is_empty() {
            short.to_string()
        } else {
            format!("{}: {}", short, detail)
        },
    })
}

#[async_trait]
impl ScoringProvider for SpeechAceClient {
    async fn score(&self, request: &ScoringRequest) -> Result<Value, ProviderError> {
        let mut audio_part =
            Part::bytes(request.audio.clone()).file_name(request.file_name.clone());
        if let Some(content_type) = &request.content_type {
            audio_part = audio_part
                .mime_str(content_type)
                .map_err(|e| ProviderError::Parse {
                    provider: PROVIDER,
                    message: format!("Invalid audio content type '{}': {}", content_type, e),
                })?;
        }

        let form = Form::new()
            .text("text", request.target_text.clone())
            .part("user_audio_file", audio_part);

        tracing::debug!(
            audio_bytes = request.audio.len(),
            dialect = %self.dialect,
            "Querying SpeechAce scoring API"
        );

        let response = self
            .http_client
            .post(self.scoring_url())
            .query(&[("key", self.api_key.as_str()), ("dialect", self.dialect.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        check_provider_status(&body)?;

        let status = provider_status(&body);
        tracing::info!(status = %status, "SpeechAce scoring successful");

        Ok(body)
    }
}
