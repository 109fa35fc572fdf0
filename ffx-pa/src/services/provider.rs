//! Outbound provider seams
//!
//! Each external service sits behind a trait so handlers can be driven by
//! fakes in tests and a provider swap touches one client module.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors from any outbound provider call
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{provider} network error: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} timed out after {secs}s")]
    Timeout { provider: &'static str, secs: u64 },

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} parse error: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Classify a reqwest failure
    pub fn from_reqwest(provider: &'static str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                provider,
                secs: timeout_secs,
            }
        } else {
            ProviderError::Network {
                provider,
                message: err.to_string(),
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }
}

/// Audio plus the sentence the learner was asked to read
#[derive(Debug, Clone)]
pub struct ScoringRequest {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub target_text: String,
}

/// Pronunciation scoring service
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    /// Score `request`, returning the provider's raw JSON
    async fn score(&self, request: &ScoringRequest) -> Result<Value, ProviderError>;
}

/// One chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request, model chosen by the client
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

/// Text generation service
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError>;
}

/// Text-to-speech service
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`; `voice` overrides the configured default
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>, ProviderError>;
}

/// Prompt template store
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Fetch the raw template registered under `name`
    async fn template(&self, name: &str) -> Result<String, ProviderError>;
}
