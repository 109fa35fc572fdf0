//! Prompt templates: Langfuse prompt store client and `{{variable}}` rendering
//!
//! Templates are fetched by name from Langfuse when it is configured. Without
//! Langfuse the built-in copies below are used.

use crate::services::provider::{PromptStore, ProviderError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use thiserror::Error;

const PROVIDER: &str = "Langfuse";

pub const QUESTIONS_PROMPT: &str = "Generate questions";
pub const PAIR_EXERCISE_PROMPT: &str = "Generate pair exercise";

const BUILTIN_QUESTIONS: &str = "You are preparing a {{target_language}} speaking practice \
session for a {{role}} working in {{industry}}. The learner's level is {{level}}.\n\
Write {{count}} short questions in {{target_language}} that this person could be asked \
in a professional conversation. Return one question per line, numbered, with no other text.";

const BUILTIN_PAIR_EXERCISE: &str = "Create a minimal-pair pronunciation exercise in \
{{target_language}} for a native {{native_language}} speaker.\n\
Target sound: {{target_phone}}\n\
Sounds the learner confuses it with: {{confused_phones}}\n\
Give five word pairs contrasting the target sound with the confused sounds, one short \
sentence using each pair, and one tip on mouth and tongue position.";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("Template variables not provided: {}", .0.join(", "))]
    MissingVariables(Vec<String>),
}

/// Where a template came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    Langfuse,
    Builtin,
}

pub fn builtin_template(name: &str) -> Option<&'static str> {
    match name {
        QUESTIONS_PROMPT => Some(BUILTIN_QUESTIONS),
        PAIR_EXERCISE_PROMPT => Some(BUILTIN_PAIR_EXERCISE),
        _ => None,
    }
}

/// Variable names used by a template, sorted and deduplicated
pub fn template_variables(template: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Substitute every `{{name}}` in `template`
///
/// Fails listing all names missing from `vars`. Unused inputs are only
/// logged.
pub fn render_template(
    template: &str,
    vars: &BTreeMap<&str, String>,
) -> Result<String, TemplateError> {
    let expected = template_variables(template);

    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !vars.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(TemplateError::MissingVariables(missing));
    }

    let unused: Vec<&str> = vars
        .keys()
        .copied()
        .filter(|name| !expected.contains(*name))
        .collect();
    if !unused.is_empty() {
        tracing::debug!(unused = ?unused, "Template ignores provided variables");
    }

    Ok(PLACEHOLDER
        .replace_all(template, |caps: &Captures| vars[&caps[1]].clone())
        .into_owned())
}

/// Fetch `name` from the store when there is one, else the built-in copy
pub async fn load_template(
    store: Option<&dyn PromptStore>,
    name: &str,
) -> Result<(String, TemplateSource), ProviderError> {
    match store {
        Some(store) => {
            let template = store.template(name).await?;
            Ok((template, TemplateSource::Langfuse))
        }
        None => builtin_template(name)
            .map(|t| (t.to_string(), TemplateSource::Builtin))
            .ok_or(ProviderError::NotConfigured(PROVIDER)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PromptBody {
    Text(String),
    Chat(Vec<ChatPromptMessage>),
}

#[derive(Debug, Deserialize)]
struct ChatPromptMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct PromptResponse {
    prompt: PromptBody,
}

impl PromptBody {
    fn into_text(self) -> String {
        match self {
            PromptBody::Text(text) => text,
            PromptBody::Chat(messages) => messages
                .into_iter()
                .map(|m| m.content)
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// Langfuse public prompts API client
pub struct LangfuseClient {
    http_client: reqwest::Client,
    public_key: String,
    secret_key: String,
    host: String,
    timeout_secs: u64,
}

impl LangfuseClient {
    pub fn new(
        public_key: String,
        secret_key: String,
        host: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            public_key,
            secret_key,
            host: host.trim_end_matches('/').to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Prompt URL with the name percent-encoded as one path segment
    pub fn prompt_url(&self, name: &str) -> Result<reqwest::Url, ProviderError> {
        let invalid = |message: String| ProviderError::Parse {
            provider: PROVIDER,
            message,
        };

        let mut url = reqwest::Url::parse(&self.host)
            .map_err(|e| invalid(format!("Invalid host '{}': {}", self.host, e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("Host '{}' cannot carry a path", self.host)))?
            .pop_if_empty()
            .extend(["api", "public", "v2", "prompts", name]);
        Ok(url)
    }
}

#[async_trait]
impl PromptStore for LangfuseClient {
    async fn template(&self, name: &str) -> Result<String, ProviderError> {
        let url = self.prompt_url(name)?;

        tracing::debug!(prompt = %name, "Fetching prompt from Langfuse");

        let response = self
            .http_client
            .get(url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
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

        let prompt: PromptResponse = response.json().await.map_err(|e| ProviderError::Parse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        Ok(prompt.prompt.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_render_substitutes_all_occurrences() {
        let rendered = render_template(
            "Say {{word}} then {{ word }} in {{language}}.",
            &vars(&[("word", "roue"), ("language", "French")]),
        )
        .unwrap();
        assert_eq!(rendered, "Say roue then roue in French.");
    }

    #[test]
    fn test_render_reports_missing_variables() {
        let err = render_template("{{a}} {{b}} {{c}}", &vars(&[("b", "x")])).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingVariables(vec!["a".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_extra_variables_are_ignored() {
        let rendered = render_template("{{a}}", &vars(&[("a", "1"), ("z", "2")])).unwrap();
        assert_eq!(rendered, "1");
    }

    #[test]
    fn test_builtin_templates_render_with_documented_inputs() {
        let questions = render_template(
            builtin_template(QUESTIONS_PROMPT).unwrap(),
            &vars(&[
                ("target_language", "French"),
                ("role", "nurse"),
                ("industry", "healthcare"),
                ("level", "B1"),
                ("count", "5"),
            ]),
        );
        assert!(questions.is_ok());

        let names = template_variables(builtin_template(PAIR_EXERCISE_PROMPT).unwrap());
        let expected: BTreeSet<String> = ["confused_phones", "native_language", "target_language", "target_phone"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_prompt_url_encodes_name() {
        let client = LangfuseClient::new(
            "pk".to_string(),
            "sk".to_string(),
            "https://cloud.langfuse.com/",
            Duration::from_secs(5),
        )
        .unwrap();

        let url = client.prompt_url(PAIR_EXERCISE_PROMPT).unwrap();
        assert_eq!(
            url.as_str(),
            "https://cloud.langfuse.com/api/public/v2/prompts/Generate%20pair%20exercise"
        );
    }

    #[test]
    fn test_prompt_body_variants() {
        let text: PromptResponse = serde_json::from_value(json!({"prompt": "Hello {{name}}"})).unwrap();
        assert_eq!(text.prompt.into_text(), "Hello {{name}}");

        let chat: PromptResponse = serde_json::from_value(json!({
            "prompt": [{"role": "system", "content": "Coach"}, {"role": "user", "content": "{{q}}"}]
        }))
        .unwrap();
        assert_eq!(chat.prompt.into_text(), "Coach\n\n{{q}}");
    }

    #[tokio::test]
    async fn test_load_template_without_store_uses_builtin() {
        let (template, source) = load_template(None, QUESTIONS_PROMPT).await.unwrap();
        assert_eq!(source, TemplateSource::Builtin);
        assert!(template.contains("{{industry}}"));

        assert!(load_template(None, "Unknown prompt").await.is_err());
    }
}
