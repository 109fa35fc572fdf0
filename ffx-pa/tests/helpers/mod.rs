//! Shared fixtures for ffx-pa integration tests
//!
//! Fake providers stand in for SpeechAce, OpenAI and Langfuse so the router
//! can be exercised without network access.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use ffx_common::config::TomlConfig;
use ffx_pa::config::ServiceConfig;
use ffx_pa::services::{
    ChatRequest, LanguageModel, PromptStore, Providers, ProviderError, ScoringProvider,
    ScoringRequest, SpeechSynthesizer,
};
use ffx_pa::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const BOUNDARY: &str = "ffx-test-boundary";

/// How the fake scoring provider answers
#[derive(Clone)]
pub enum Scoring {
    Respond(Value),
    TimeOut,
    Reject(u16),
}

pub struct FakeScoring {
    pub behavior: Scoring,
    pub calls: Mutex<Vec<ScoringRequest>>,
}

impl FakeScoring {
    pub fn new(behavior: Scoring) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ScoringProvider for FakeScoring {
    async fn score(&self, request: &ScoringRequest) -> Result<Value, ProviderError> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.behavior {
            Scoring::Respond(value) => Ok(value.clone()),
            Scoring::TimeOut => Err(ProviderError::Timeout {
                provider: "SpeechAce",
                secs: 9,
            }),
            Scoring::Reject(status) => Err(ProviderError::Api {
                provider: "SpeechAce",
                status: *status,
                body: "rejected".to_string(),
            }),
        }
    }
}

/// Replies with a fixed string after an optional delay
pub struct FakeModel {
    pub reply: String,
    pub delay: Duration,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: "too late".to_string(),
            delay,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.reply.clone())
    }
}

/// Returns fixed audio, or an API error with `reject_status` when set
pub struct FakeSpeech {
    pub audio: Vec<u8>,
    pub reject_status: Option<u16>,
    pub voices: Mutex<Vec<Option<String>>>,
}

impl FakeSpeech {
    pub fn new(audio: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            audio: audio.to_vec(),
            reject_status: None,
            voices: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting(status: u16) -> Arc<Self> {
        Arc::new(Self {
            audio: Vec::new(),
            reject_status: Some(status),
            voices: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, _text: &str, voice: Option<&str>) -> Result<Vec<u8>, ProviderError> {
        self.voices.lock().unwrap().push(voice.map(str::to_string));
        match self.reject_status {
            Some(status) => Err(ProviderError::Api {
                provider: "OpenAI",
                status,
                body: "speech rejected".to_string(),
            }),
            None => Ok(self.audio.clone()),
        }
    }
}

pub struct FakeStore(pub String);

#[async_trait]
impl PromptStore for FakeStore {
    async fn template(&self, _name: &str) -> Result<String, ProviderError> {
        Ok(self.0.clone())
    }
}

/// Configuration with defaults only; keys come from the injected providers
pub fn test_config() -> ServiceConfig {
    ServiceConfig::from_toml(&TomlConfig::default()).unwrap()
}

pub fn app(config: ServiceConfig, providers: Providers) -> axum::Router {
    build_router(AppState::new(config, providers))
}

fn phone(label: &str, score: f64, like: &str) -> Value {
    json!({"phone": label, "quality_score": score, "sound_most_like": like})
}

/// SpeechAce-shaped response for "bonjour merci"
pub fn speechace_response() -> Value {
    json!({
        "status": "success",
        "quota_remaining": 42,
        "text_score": {
            "text": "bonjour merci",
            "word_score_list": [
                {
                    "word": "bonjour",
                    "quality_score": 80,
                    "syllable_score_list": [
                        {"letters": "bon", "quality_score": 90, "phone_count": 2},
                        {"letters": "jour", "quality_score": 70, "phone_count": 2}
                    ],
                    "phone_score_list": [
                        phone("b", 95.0, "b"),
                        phone("on", 85.0, "on"),
                        phone("zh", 60.0, "z"),
                        phone("uw", 80.0, "uw")
                    ]
                },
                {
                    "word": "merci",
                    "quality_score": 60,
                    "syllable_score_list": [
                        {"letters": "mer", "quality_score": 50, "phone_count": 3},
                        {"letters": "ci", "quality_score": 70, "phone_count": 2}
                    ],
                    "phone_score_list": [
                        phone("m", 90.0, "m"),
                        phone("eh", 40.0, "ey"),
                        phone("r", 20.0, "l"),
                        phone("s", 80.0, "s"),
                        phone("iy", 60.0, "ih")
                    ]
                }
            ],
            "speechace_score": {"pronunciation": 71},
            "cefr_score": {"pronunciation": "B2"}
        }
    })
}

/// One multipart part
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Form with a small audio file and the given text fields
pub fn analysis_form(audio: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut parts = vec![Part::File {
        name: "audio_file",
        file_name: "take1.wav",
        content_type: "audio/wav",
        data: audio,
    }];
    parts.extend(fields.iter().map(|(name, value)| Part::Text(name, value)));
    multipart_body(&parts)
}

pub fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Send one request, returning the response and its collected body
pub async fn send(app: axum::Router, request: Request<Body>) -> (Response<Body>, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes().to_vec();
    (Response::from_parts(parts, Body::empty()), bytes)
}

pub async fn send_json(app: axum::Router, request: Request<Body>) -> (u16, Value) {
    let (response, bytes) = send(app, request).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (response.status().as_u16(), value)
}
