//! Service configuration for ffx-pa
//!
//! Built once at startup from the TOML bootstrap file and the environment,
//! then shared read-only. Provider credentials resolve ENV → TOML; a missing
//! credential disables only the endpoints that need it.

use crate::services::feedback::FeedbackSettings;
use ffx_common::config::{is_valid_key, OpenAiSection, TomlConfig};
use ffx_common::{CefrBands, Error, Result};
use std::time::Duration;
use tracing::{info, warn};

pub const SPEECHACE_KEY_ENV: &str = "SPEECHACE_API_KEY";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const LANGFUSE_PUBLIC_KEY_ENV: &str = "LANGFUSE_PUBLIC_KEY";
pub const LANGFUSE_SECRET_KEY_ENV: &str = "LANGFUSE_SECRET_KEY";
pub const LANGFUSE_HOST_ENV: &str = "LANGFUSE_HOST";

/// Where a credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    Toml,
}

/// Resolve a credential, environment first
///
/// Blank values count as absent. When both sources carry a value a warning
/// names them; the environment wins.
pub fn resolve_key(name: &str, env_var: &str, toml_value: Option<&str>) -> Option<(String, KeySource)> {
    let env_value = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_value = toml_value.filter(|k| is_valid_key(k));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in environment and TOML. Using environment ({}).",
            name, env_var
        );
    }

    if let Some(key) = env_value {
        info!("{} loaded from environment variable", name);
        return Some((key, KeySource::Environment));
    }

    if let Some(key) = toml_value {
        info!("{} loaded from TOML config", name);
        return Some((key.to_string(), KeySource::Toml));
    }

    None
}

/// Outbound call timeouts
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub scoring: Duration,
    pub llm: Duration,
    pub tts: Duration,
    pub prompt: Duration,
}

#[derive(Debug, Clone)]
pub struct SpeechAceSettings {
    pub api_key: String,
    pub base_url: String,
    pub dialect: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub tts_model: String,
    pub tts_voice: String,
}

#[derive(Debug, Clone)]
pub struct LangfuseSettings {
    pub public_key: String,
    pub secret_key: String,
    pub host: String,
}

/// Process-wide read-only configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub include_raw_response: bool,
    pub speechace: Option<SpeechAceSettings>,
    pub openai: Option<OpenAiSettings>,
    pub langfuse: Option<LangfuseSettings>,
    pub timeouts: Timeouts,
    pub feedback: FeedbackSettings,
    pub cefr_bands: CefrBands,
}

impl ServiceConfig {
    pub fn from_toml(toml: &TomlConfig) -> Result<Self> {
        let cefr_bands = if toml.cefr_bands.is_empty() {
            info!("No CEFR bands configured, using equal-width bands");
            CefrBands::uniform()
        } else {
            CefrBands::new(toml.cefr_bands.clone())?
        };

        let timeouts = Timeouts {
            scoring: timeout("scoring_secs", toml.timeouts.scoring_secs)?,
            llm: timeout("llm_secs", toml.timeouts.llm_secs)?,
            tts: timeout("tts_secs", toml.timeouts.tts_secs)?,
            prompt: timeout("prompt_secs", toml.timeouts.prompt_secs)?,
        };

        let speechace = resolve_key(
            "SpeechAce API key",
            SPEECHACE_KEY_ENV,
            toml.speechace.api_key.as_deref(),
        )
        .map(|(api_key, _)| SpeechAceSettings {
            api_key,
            base_url: toml.speechace.base_url.clone(),
            dialect: toml.speechace.dialect.clone(),
        });

        let openai = resolve_key("OpenAI API key", OPENAI_KEY_ENV, toml.openai.api_key.as_deref())
            .map(|(api_key, _)| openai_settings(api_key, &toml.openai));

        let public_key = resolve_key(
            "Langfuse public key",
            LANGFUSE_PUBLIC_KEY_ENV,
            toml.langfuse.public_key.as_deref(),
        );
        let secret_key = resolve_key(
            "Langfuse secret key",
            LANGFUSE_SECRET_KEY_ENV,
            toml.langfuse.secret_key.as_deref(),
        );
        let langfuse = match (public_key, secret_key) {
            (Some((public_key, _)), Some((secret_key, _))) => Some(LangfuseSettings {
                public_key,
                secret_key,
                host: std::env::var(LANGFUSE_HOST_ENV)
                    .ok()
                    .filter(|h| is_valid_key(h))
                    .unwrap_or_else(|| toml.langfuse.host.clone()),
            }),
            (None, None) => None,
            _ => {
                warn!("Langfuse needs both public and secret keys; using built-in prompts");
                None
            }
        };

        Ok(Self {
            bind: toml.bind.clone(),
            port: toml.port,
            max_upload_bytes: toml.max_upload_bytes,
            include_raw_response: toml.include_raw_response,
            speechace,
            openai,
            langfuse,
            feedback: FeedbackSettings {
                max_chars: toml.feedback.max_chars,
                max_tokens: toml.feedback.max_tokens,
                temperature: toml.feedback.temperature,
                needs_work_threshold: toml.feedback.needs_work_threshold,
                timeout: timeouts.llm,
            },
            timeouts,
            cefr_bands,
        })
    }
}

/// Outbound timeouts must be at least one second
fn timeout(name: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(Error::Config(format!("[timeouts] {} must be greater than 0", name)));
    }
    Ok(Duration::from_secs(secs))
}

fn openai_settings(api_key: String, section: &OpenAiSection) -> OpenAiSettings {
    OpenAiSettings {
        api_key,
        base_url: section.base_url.clone(),
        chat_model: section.chat_model.clone(),
        tts_model: section.tts_model.clone(),
        tts_voice: section.tts_voice.clone(),
    }
}
