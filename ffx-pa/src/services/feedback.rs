//! Coaching feedback: prompt construction and the guarded LLM call
//!
//! The prompt carries the overall score, the three weakest words and the
//! three weakest phone groups as a JSON document. The model call is bounded
//! by a timeout, and any failure is reported as a tagged
//! [`FeedbackOutcome::Unavailable`] so the scoring result is still returned.

use crate::models::{FeedbackOutcome, PhoneGroups, PronunciationResult, UnavailableReason};
use crate::services::provider::{ChatMessage, ChatRequest, LanguageModel};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SYSTEM_MESSAGE: &str = "You are a supportive French pronunciation coach. Always be \
encouraging and provide specific, actionable feedback.";

const DEFAULT_CHEER: &str = "Great effort! Keep practicing!";
const DEFAULT_FEEDBACK: &str = "Continue working on your pronunciation.";

/// How many words and phone groups the prompt highlights
pub const WEAKEST_COUNT: usize = 3;

/// Examples listed per weak phone group
const EXAMPLES_PER_PHONE: usize = 3;

/// Knobs for feedback generation
#[derive(Debug, Clone)]
pub struct FeedbackSettings {
    pub max_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub needs_work_threshold: f64,
    pub timeout: Duration,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            max_chars: 800,
            max_tokens: 200,
            temperature: 0.7,
            needs_work_threshold: 70.0,
            timeout: Duration::from_secs(8),
        }
    }
}

/// Ready-to-send feedback request plus the structured input it embeds
#[derive(Debug, Clone)]
pub struct FeedbackPrompt {
    pub input: Value,
    pub request: ChatRequest,
}

/// Structured summary handed to the model
pub fn feedback_input(
    result: &PronunciationResult,
    groups: &PhoneGroups,
    needs_work_threshold: f64,
) -> Value {
    let weakest_words: Vec<Value> = result
        .lowest_words(WEAKEST_COUNT)
        .into_iter()
        .map(|word| {
            let weak_phones: Vec<Value> = word
                .phones()
                .filter(|p| p.needs_work(needs_work_threshold))
                .map(|p| {
                    json!({
                        "phone": p.phone,
                        "quality_score": p.quality_score.round(),
                        "sound_most_like": p.sound_most_like,
                    })
                })
                .collect();
            json!({
                "word": word.word,
                "quality_score": word.quality_score.round(),
                "weak_phones": weak_phones,
            })
        })
        .collect();

    let weakest_phones: Vec<Value> = groups
        .lowest(WEAKEST_COUNT)
        .into_iter()
        .map(|group| {
            let summary = group.summary();
            let examples: Vec<Value> = group
                .worst_first()
                .into_iter()
                .take(EXAMPLES_PER_PHONE)
                .map(|o| json!({"word": o.word, "quality_score": o.score.quality_score.round()}))
                .collect();
            json!({
                "phone": summary.phone,
                "average_quality_score": summary.average_quality_score,
                "occurrences": summary.occurrences,
                "sounds_most_like": summary.sounds_most_like,
                "worst_examples": examples,
            })
        })
        .collect();

    json!({
        "target_text": result.target_text,
        "overall_score": result.overall_score.round(),
        "cefr_level": result.cefr_level,
        "weakest_words": weakest_words,
        "weakest_phones": weakest_phones,
    })
}

/// Build the chat request asking for coaching on `result`
pub fn build_feedback_prompt(
    result: &PronunciationResult,
    groups: &PhoneGroups,
    settings: &FeedbackSettings,
) -> FeedbackPrompt {
    let input = feedback_input(result, groups, settings.needs_work_threshold);
    let pretty = serde_json::to_string_pretty(&input).unwrap_or_else(|_| input.to_string());

    let user = format!(
        "Here is the pronunciation analysis of a learner reading a French sentence:\n\n\
         {pretty}\n\n\
         Please provide:\n\
         1. A short, encouraging cheering message (1-2 sentences, positive and motivating)\n\
         2. Specific, actionable feedback focused on the weakest words and phones above\n\n\
         Respond in JSON format:\n\
         {{\"cheering_message\": \"...\", \"feedback\": \"...\"}}\n\n\
         Keep it under {} characters in total.",
        settings.max_chars
    );

    FeedbackPrompt {
        input,
        request: ChatRequest {
            messages: vec![ChatMessage::system(SYSTEM_MESSAGE), ChatMessage::user(user)],
            max_tokens: Some(settings.max_tokens),
            temperature: settings.temperature,
        },
    }
}

#[derive(Debug, Deserialize)]
struct FeedbackReply {
    #[serde(default)]
    cheering_message: Option<String>,
    #[serde(default)]
    feedback: Option<String>,
}

/// Cut `text` to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].trim_end().to_string(),
        None => text.to_string(),
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Interpret the model's reply; plain text becomes the feedback body
pub fn parse_feedback_reply(reply: &str, max_chars: usize) -> FeedbackOutcome {
    let trimmed = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let (cheering, feedback) = match serde_json::from_str::<FeedbackReply>(trimmed) {
        Ok(parsed) => (
            non_blank(parsed.cheering_message).unwrap_or_else(|| DEFAULT_CHEER.to_string()),
            non_blank(parsed.feedback).unwrap_or_else(|| DEFAULT_FEEDBACK.to_string()),
        ),
        Err(_) => (
            DEFAULT_CHEER.to_string(),
            non_blank(Some(reply.trim().to_string()))
                .unwrap_or_else(|| DEFAULT_FEEDBACK.to_string()),
        ),
    };

    FeedbackOutcome::Available {
        cheering_message: truncate_chars(&cheering, max_chars),
        feedback: truncate_chars(&feedback, max_chars),
    }
}

/// Ask the model for coaching text, never failing the caller
pub async fn generate_feedback(
    llm: Option<&dyn LanguageModel>,
    result: &PronunciationResult,
    groups: &PhoneGroups,
    settings: &FeedbackSettings,
) -> FeedbackOutcome {
    let Some(llm) = llm else {
        return FeedbackOutcome::unavailable(
            UnavailableReason::NotConfigured,
            "Language model is not configured",
        );
    };

    let prompt = build_feedback_prompt(result, groups, settings);

    match tokio::time::timeout(settings.timeout, llm.complete(&prompt.request)).await {
        Ok(Ok(reply)) => parse_feedback_reply(&reply, settings.max_chars),
        Ok(Err(e)) if e.is_timeout() => {
            tracing::warn!(error = %e, "Feedback generation timed out");
            FeedbackOutcome::unavailable(UnavailableReason::Timeout, e.to_string())
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Feedback generation failed");
            FeedbackOutcome::unavailable(UnavailableReason::ProviderError, e.to_string())
        }
        Err(_) => {
            tracing::warn!(timeout = ?settings.timeout, "Feedback generation timed out");
            FeedbackOutcome::unavailable(
                UnavailableReason::Timeout,
                format!("No reply within {}s", settings.timeout.as_secs_f32()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::phone_aggregator::group_by_phone;
    use crate::services::provider::ProviderError;
    use crate::models::{PhoneScore, SyllableScore, WordScore};
    use async_trait::async_trait;
    use ffx_common::CefrLevel;

    fn word(text: &str, score: f64, phones: &[(&str, f64, Option<&str>)]) -> WordScore {
        WordScore {
            word: text.to_string(),
            quality_score: score,
            syllables: vec![SyllableScore {
                letters: text.to_string(),
                quality_score: score,
                phones: phones
                    .iter()
                    .enumerate()
                    .map(|(i, (label, s, like))| PhoneScore {
                        phone: label.to_string(),
                        quality_score: *s,
                        sound_most_like: like.map(str::to_string),
                        position: i,
                    })
                    .collect(),
            }],
        }
    }

    fn sample() -> PronunciationResult {
        PronunciationResult {
            target_text: "le rouge et le vert".to_string(),
            words: vec![
                word("le", 92.0, &[("l", 95.0, None), ("ax", 89.0, None)]),
                word("rouge", 48.0, &[("r", 35.0, Some("w")), ("uw", 70.0, None), ("zh", 39.0, Some("jh"))]),
                word("et", 85.0, &[("ey", 85.0, None)]),
                word("le", 90.0, &[("l", 93.0, None), ("ax", 87.0, None)]),
                word("vert", 61.0, &[("v", 80.0, None), ("eh", 72.0, None), ("r", 31.0, Some("hh"))]),
            ],
            overall_score: 75.2,
            cefr_level: CefrLevel::B2,
            provider_cefr_level: None,
            provider_status: None,
        }
    }

    struct FixedReply(&'static str);

    #[async_trait]
    impl LanguageModel for FixedReply {
        async fn complete(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    struct SlowModel;

    #[async_trait]
    impl LanguageModel for SlowModel {
        async fn complete(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn complete(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
            Err(ProviderError::Api {
                provider: "OpenAI",
                status: 500,
                body: "upstream".to_string(),
            })
        }
    }

    #[test]
    fn test_input_highlights_three_weakest_words_and_phones() {
        let result = sample();
        let groups = group_by_phone(&result);
        let input = feedback_input(&result, &groups, 70.0);

        assert_eq!(input["overall_score"], 75.0);
        assert_eq!(input["cefr_level"], "B2");

        let words: Vec<&str> = input["weakest_words"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["word"].as_str().unwrap())
            .collect();
        assert_eq!(words, vec!["rouge", "vert", "et"]);

        let rouge_weak: Vec<&str> = input["weakest_words"][0]["weak_phones"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["phone"].as_str().unwrap())
            .collect();
        assert_eq!(rouge_weak, vec!["r", "zh"]);

        let phones: Vec<&str> = input["weakest_phones"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["phone"].as_str().unwrap())
            .collect();
        assert_eq!(phones, vec!["r", "zh", "uw"]);
        assert_eq!(input["weakest_phones"][0]["sounds_most_like"], json!(["hh", "w"]));
        assert_eq!(input["weakest_phones"][0]["worst_examples"][0]["word"], "vert");
    }

    #[test]
    fn test_prompt_embeds_input_and_limits() {
        let result = sample();
        let groups = group_by_phone(&result);
        let settings = FeedbackSettings::default();
        let prompt = build_feedback_prompt(&result, &groups, &settings);

        assert_eq!(prompt.request.messages.len(), 2);
        assert_eq!(prompt.request.messages[0].role, "system");
        assert!(prompt.request.messages[1].content.contains("\"weakest_phones\""));
        assert_eq!(prompt.request.max_tokens, Some(200));
    }

    #[test]
    fn test_parse_json_reply() {
        let outcome = parse_feedback_reply(
            r#"{"cheering_message": "Bravo !", "feedback": "Roll the r less."}"#,
            800,
        );
        assert_eq!(
            outcome,
            FeedbackOutcome::Available {
                cheering_message: "Bravo !".to_string(),
                feedback: "Roll the r less.".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_fenced_json_reply() {
        let outcome = parse_feedback_reply("```json\n{\"cheering_message\": \"Super\", \"feedback\": \"ok\"}\n```", 800);
        assert!(matches!(outcome, FeedbackOutcome::Available { ref cheering_message, .. } if cheering_message == "Super"));
    }

    #[test]
    fn test_plain_text_reply_becomes_feedback() {
        let outcome = parse_feedback_reply("Work on your r sound.", 800);
        assert_eq!(
            outcome,
            FeedbackOutcome::Available {
                cheering_message: DEFAULT_CHEER.to_string(),
                feedback: "Work on your r sound.".to_string(),
            }
        );
    }

    #[test]
    fn test_blank_reply_gets_default_feedback() {
        assert_eq!(
            parse_feedback_reply("   ", 800),
            FeedbackOutcome::Available {
                cheering_message: DEFAULT_CHEER.to_string(),
                feedback: DEFAULT_FEEDBACK.to_string(),
            }
        );
    }

    #[test]
    fn test_json_reply_without_feedback_gets_default() {
        assert_eq!(
            parse_feedback_reply(r#"{"cheering_message": "Bravo"}"#, 800),
            FeedbackOutcome::Available {
                cheering_message: "Bravo".to_string(),
                feedback: DEFAULT_FEEDBACK.to_string(),
            }
        );
        assert_eq!(
            parse_feedback_reply(r#"{"cheering_message": " ", "feedback": ""}"#, 800),
            FeedbackOutcome::Available {
                cheering_message: DEFAULT_CHEER.to_string(),
                feedback: DEFAULT_FEEDBACK.to_string(),
            }
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("éèêë", 2), "éè");
        assert_eq!(truncate_chars("court", 10), "court");
        assert_eq!(truncate_chars("abc def", 4), "abc");
    }

    #[tokio::test]
    async fn test_generate_with_reply() {
        let result = sample();
        let groups = group_by_phone(&result);
        let model = FixedReply(r#"{"cheering_message": "Bien !", "feedback": "Travaillez le r."}"#);

        let outcome = generate_feedback(Some(&model), &result, &groups, &FeedbackSettings::default()).await;
        assert!(outcome.is_available());
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let result = sample();
        let groups = group_by_phone(&result);
        let settings = FeedbackSettings {
            timeout: Duration::from_millis(50),
            ..FeedbackSettings::default()
        };

        let outcome = generate_feedback(Some(&SlowModel), &result, &groups, &settings).await;
        assert!(matches!(
            outcome,
            FeedbackOutcome::Unavailable { reason: UnavailableReason::Timeout, .. }
        ));
    }

    #[tokio::test]
    async fn test_generate_provider_error_and_missing_model() {
        let result = sample();
        let groups = group_by_phone(&result);
        let settings = FeedbackSettings::default();

        let failed = generate_feedback(Some(&FailingModel), &result, &groups, &settings).await;
        assert!(matches!(
            failed,
            FeedbackOutcome::Unavailable { reason: UnavailableReason::ProviderError, .. }
        ));

        let missing = generate_feedback(None, &result, &groups, &settings).await;
        assert!(matches!(
            missing,
            FeedbackOutcome::Unavailable { reason: UnavailableReason::NotConfigured, .. }
        ));
    }
}
