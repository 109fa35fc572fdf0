//! Service modules: the response normalizer, phone aggregation, feedback and
//! the outbound provider clients

pub mod feedback;
pub mod normalizer;
pub mod openai_client;
pub mod phone_aggregator;
pub mod practice;
pub mod prompts;
pub mod provider;
pub mod speechace_client;

pub use feedback::{build_feedback_prompt, generate_feedback, FeedbackPrompt, FeedbackSettings};
pub use normalizer::{normalize, NormalizeError};
pub use openai_client::{OpenAiChatClient, OpenAiSpeechClient};
pub use phone_aggregator::group_by_phone;
pub use prompts::LangfuseClient;
pub use provider::{
    ChatMessage, ChatRequest, LanguageModel, PromptStore, ProviderError, ScoringProvider,
    ScoringRequest, SpeechSynthesizer,
};
pub use speechace_client::SpeechAceClient;

use crate::config::ServiceConfig;
use std::sync::Arc;

/// Outbound providers available to handlers; `None` when not configured
#[derive(Clone, Default)]
pub struct Providers {
    pub scoring: Option<Arc<dyn ScoringProvider>>,
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub tts: Option<Arc<dyn SpeechSynthesizer>>,
    pub prompts: Option<Arc<dyn PromptStore>>,
}

impl Providers {
    /// Build real HTTP clients for every configured provider
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ProviderError> {
        let mut providers = Providers::default();

        if let Some(speechace) = &config.speechace {
            providers.scoring = Some(Arc::new(SpeechAceClient::new(
                speechace.api_key.clone(),
                &speechace.base_url,
                &speechace.dialect,
                config.timeouts.scoring,
            )?));
        }

        if let Some(openai) = &config.openai {
            providers.llm = Some(Arc::new(OpenAiChatClient::new(
                openai.api_key.clone(),
                &openai.base_url,
                &openai.chat_model,
                config.timeouts.llm,
            )?));
            providers.tts = Some(Arc::new(OpenAiSpeechClient::new(
                openai.api_key.clone(),
                &openai.base_url,
                &openai.tts_model,
                &openai.tts_voice,
                config.timeouts.tts,
            )?));
        }

        if let Some(langfuse) = &config.langfuse {
            providers.prompts = Some(Arc::new(LangfuseClient::new(
                langfuse.public_key.clone(),
                langfuse.secret_key.clone(),
                &langfuse.host,
                config.timeouts.prompt,
            )?));
        }

        Ok(providers)
    }

    pub fn status(&self) -> ProviderStatus {
        ProviderStatus {
            speechace: self.scoring.is_some(),
            openai: self.llm.is_some(),
            tts: self.tts.is_some(),
            langfuse: self.prompts.is_some(),
        }
    }
}

/// Which providers are configured, for health reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ProviderStatus {
    pub speechace: bool,
    pub openai: bool,
    pub tts: bool,
    pub langfuse: bool,
}

impl ProviderStatus {
    /// Scoring and the language model; Langfuse is optional because
    /// built-in templates stand in for it
    pub fn required_configured(&self) -> bool {
        self.speechace && self.openai && self.tts
    }
}
