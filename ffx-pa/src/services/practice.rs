//! Practice material generation: speaking questions and minimal-pair drills
//!
//! Both are prompt-store template + language-model passthroughs.

use crate::services::prompts::{
    load_template, render_template, TemplateError, TemplateSource, PAIR_EXERCISE_PROMPT,
    QUESTIONS_PROMPT,
};
use crate::services::provider::{ChatMessage, ChatRequest, LanguageModel, PromptStore, ProviderError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_QUESTION_COUNT: u8 = 5;
pub const MAX_QUESTION_COUNT: u8 = 10;

const QUESTIONS_TEMPERATURE: f32 = 0.7;
const PAIR_EXERCISE_TEMPERATURE: f32 = 0.2;

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\d+\s*[.):-]|[-*•])\s*").expect("list marker pattern is valid")
});

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

fn default_language() -> String {
    "French".to_string()
}

fn default_native_language() -> String {
    "English".to_string()
}

fn require(field: &str, value: &str) -> Result<(), PracticeError> {
    if value.trim().is_empty() {
        Err(PracticeError::InvalidRequest(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

/// Learner profile for question generation
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    pub industry: String,
    pub role: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub count: Option<u8>,
    #[serde(default = "default_language")]
    pub target_language: String,
}

impl QuestionRequest {
    pub fn validate(&self) -> Result<u8, PracticeError> {
        require("industry", &self.industry)?;
        require("role", &self.role)?;
        let count = self.count.unwrap_or(DEFAULT_QUESTION_COUNT);
        if !(1..=MAX_QUESTION_COUNT).contains(&count) {
            return Err(PracticeError::InvalidRequest(format!(
                "count must be between 1 and {}",
                MAX_QUESTION_COUNT
            )));
        }
        Ok(count)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuestions {
    pub text: String,
    pub questions: Vec<String>,
    pub prompt_source: TemplateSource,
}

/// Minimal-pair drill request
#[derive(Debug, Clone, Deserialize)]
pub struct PairExerciseRequest {
    pub target_phone: String,
    #[serde(default)]
    pub confused_phones: Vec<String>,
    #[serde(default = "default_language")]
    pub target_language: String,
    #[serde(default = "default_native_language")]
    pub native_language: String,
}

impl PairExerciseRequest {
    pub fn validate(&self) -> Result<(), PracticeError> {
        require("target_phone", &self.target_phone)?;
        require("target_language", &self.target_language)?;
        require("native_language", &self.native_language)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PairExercise {
    pub exercise: String,
    pub prompt_source: TemplateSource,
}

/// Split model output into questions, dropping numbering and bullets
pub fn parse_question_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

async fn run_prompt(
    llm: &dyn LanguageModel,
    store: Option<&dyn PromptStore>,
    name: &str,
    vars: &BTreeMap<&str, String>,
    temperature: f32,
) -> Result<(String, TemplateSource), PracticeError> {
    let (template, source) = load_template(store, name).await?;
    let prompt = render_template(&template, vars)?;

    let reply = llm
        .complete(&ChatRequest {
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: None,
            temperature,
        })
        .await?;

    tracing::info!(prompt = %name, source = ?source, reply_chars = reply.chars().count(), "Prompt completed");
    Ok((reply, source))
}

pub async fn generate_questions(
    llm: &dyn LanguageModel,
    store: Option<&dyn PromptStore>,
    request: &QuestionRequest,
) -> Result<GeneratedQuestions, PracticeError> {
    let count = request.validate()?;

    let vars = BTreeMap::from([
        ("industry", request.industry.trim().to_string()),
        ("role", request.role.trim().to_string()),
        (
            "level",
            request
                .level
                .clone()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| "intermediate".to_string()),
        ),
        ("count", count.to_string()),
        ("target_language", request.target_language.clone()),
    ]);

    let (text, prompt_source) =
        run_prompt(llm, store, QUESTIONS_PROMPT, &vars, QUESTIONS_TEMPERATURE).await?;

    Ok(GeneratedQuestions {
        questions: parse_question_lines(&text),
        text,
        prompt_source,
    })
}

pub async fn generate_pair_exercise(
    llm: &dyn LanguageModel,
    store: Option<&dyn PromptStore>,
    request: &PairExerciseRequest,
) -> Result<PairExercise, PracticeError> {
    request.validate()?;

    let vars = BTreeMap::from([
        ("target_phone", request.target_phone.clone()),
        ("confused_phones", request.confused_phones.join(", ")),
        ("target_language", request.target_language.clone()),
        ("native_language", request.native_language.clone()),
    ]);

    let (exercise, prompt_source) =
        run_prompt(llm, store, PAIR_EXERCISE_PROMPT, &vars, PAIR_EXERCISE_TEMPERATURE).await?;

    Ok(PairExercise {
        exercise,
        prompt_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the last request and answers with a fixed reply
    struct RecordingModel {
        reply: &'static str,
        last: Mutex<Option<ChatRequest>>,
    }

    impl RecordingModel {
        fn new(reply: &'static str) -> Self {
            Self {
                reply,
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
            *self.last.lock().unwrap() = Some(request.clone());
            Ok(self.reply.to_string())
        }
    }

    struct FixedStore(&'static str);

    #[async_trait]
    impl PromptStore for FixedStore {
        async fn template(&self, _name: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    fn question_request() -> QuestionRequest {
        QuestionRequest {
            industry: "hospitality".to_string(),
            role: "receptionist".to_string(),
            level: None,
            count: None,
            target_language: default_language(),
        }
    }

    #[test]
    fn test_parse_question_lines_strips_markers() {
        let text = "1. Comment allez-vous ?\n2) Où travaillez-vous ?\n\n- Quel est votre rôle ?\n• Pourquoi ?";
        assert_eq!(
            parse_question_lines(text),
            vec![
                "Comment allez-vous ?",
                "Où travaillez-vous ?",
                "Quel est votre rôle ?",
                "Pourquoi ?"
            ]
        );
    }

    #[test]
    fn test_question_request_validation() {
        assert_eq!(question_request().validate().unwrap(), DEFAULT_QUESTION_COUNT);

        let mut blank = question_request();
        blank.role = "  ".to_string();
        assert!(matches!(blank.validate(), Err(PracticeError::InvalidRequest(_))));

        let mut too_many = question_request();
        too_many.count = Some(11);
        assert!(too_many.validate().is_err());
    }

    #[tokio::test]
    async fn test_generate_questions_with_builtin_template() {
        let model = RecordingModel::new("1. Bonjour ?\n2. Ça va ?");
        let generated = generate_questions(&model, None, &question_request()).await.unwrap();

        assert_eq!(generated.prompt_source, TemplateSource::Builtin);
        assert_eq!(generated.questions, vec!["Bonjour ?", "Ça va ?"]);

        let sent = model.last.lock().unwrap().clone().unwrap();
        assert!(sent.messages[0].content.contains("receptionist"));
        assert!(sent.messages[0].content.contains("hospitality"));
    }

    #[tokio::test]
    async fn test_pair_exercise_uses_store_template() {
        let model = RecordingModel::new("pain / bain");
        let store = FixedStore("Drill {{target_phone}} vs {{confused_phones}}");
        let request = PairExerciseRequest {
            target_phone: "b".to_string(),
            confused_phones: vec!["p".to_string(), "v".to_string()],
            target_language: default_language(),
            native_language: default_native_language(),
        };

        let exercise = generate_pair_exercise(&model, Some(&store), &request).await.unwrap();
        assert_eq!(exercise.exercise, "pain / bain");
        assert_eq!(exercise.prompt_source, TemplateSource::Langfuse);

        let sent = model.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.messages[0].content, "Drill b vs p, v");
        assert_eq!(sent.temperature, PAIR_EXERCISE_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_store_template_missing_variable() {
        let model = RecordingModel::new("unused");
        let store = FixedStore("Drill {{target_phone}} for {{learner_name}}");
        let request = PairExerciseRequest {
            target_phone: "r".to_string(),
            confused_phones: Vec::new(),
            target_language: default_language(),
            native_language: default_native_language(),
        };

        let err = generate_pair_exercise(&model, Some(&store), &request).await.unwrap_err();
        assert!(matches!(err, PracticeError::Template(TemplateError::MissingVariables(_))));
        assert!(model.last.lock().unwrap().is_none());
    }
}
