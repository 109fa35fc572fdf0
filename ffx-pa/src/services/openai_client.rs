//! OpenAI chat completion and speech synthesis clients

use crate::services::provider::{
    ChatMessage, ChatRequest, LanguageModel, ProviderError, SpeechSynthesizer,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "OpenAI";
const USER_AGENT: &str = concat!("Francoflex/", env!("CARGO_PKG_VERSION"));

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network {
            provider: PROVIDER,
            message: e.to_string(),
        })
}

async fn api_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Api {
        provider: PROVIDER,
        status,
        body,
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions client
pub struct OpenAiChatClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiChatClient {
    pub fn new(
        api_key: String,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(model = %self.model, messages = request.messages.len(), "Requesting chat completion");

        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|e| ProviderError::Parse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ProviderError::Parse {
                provider: PROVIDER,
                message: "completion has no message content".to_string(),
            })
    }
}

#[derive(Debug, Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

/// Text-to-speech client (MP3 output)
pub struct OpenAiSpeechClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    default_voice: String,
    timeout_secs: u64,
}

impl OpenAiSpeechClient {
    pub fn new(
        api_key: String,
        base_url: &str,
        model: &str,
        default_voice: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            default_voice: default_voice.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn speech_url(&self) -> String {
        format!("{}/v1/audio/speech", self.base_url)
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechClient {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>, ProviderError> {
        let voice = voice.unwrap_or(&self.default_voice);
        let body = SpeechBody {
            model: &self.model,
            voice,
            input: text,
        };

        tracing::debug!(model = %self.model, voice = %voice, chars = text.chars().count(), "Requesting speech synthesis");

        let response = self
            .http_client
            .post(self.speech_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, e))?;

        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion_body_omits_unset_max_tokens() {
        let messages = vec![ChatMessage::user("Bonjour")];
        let body = CompletionBody {
            model: "gpt-3.5-turbo",
            messages: &messages,
            max_tokens: None,
            temperature: 0.2,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][0], json!({"role": "user", "content": "Bonjour"}));
    }

    #[test]
    fn test_completion_response_parsing() {
        let parsed: CompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Très bien !"}}]
        }))
        .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Très bien !"));
    }

    #[test]
    fn test_urls() {
        let chat = OpenAiChatClient::new(
            "k".to_string(),
            "https://api.openai.com/",
            "gpt-3.5-turbo",
            Duration::from_secs(8),
        )
        .unwrap();
        assert_eq!(chat.completions_url(), "https://api.openai.com/v1/chat/completions");

        let speech = OpenAiSpeechClient::new(
            "k".to_string(),
            "https://api.openai.com",
            "tts-1",
            "alloy",
            Duration::from_secs(8),
        )
        .unwrap();
        assert_eq!(speech.speech_url(), "https://api.openai.com/v1/audio/speech");
    }
}
