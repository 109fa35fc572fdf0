//! SpeechAce response normalizer
//!
//! Translates the provider's `text_score` payload into [`PronunciationResult`].
//! All knowledge of provider field names and score scales is confined to this
//! module. Any missing or non-numeric required field fails the whole
//! response; a partially filled result is never returned.

use crate::models::{PhoneScore, PronunciationResult, SyllableScore, WordScore};
use ffx_common::CefrBands;
use serde_json::Value;
use thiserror::Error;

/// Upper bound of the provider's quality_score scale
const PROVIDER_SCORE_MAX: f64 = 100.0;

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),
}

type Result<T> = std::result::Result<T, NormalizeError>;

fn malformed(message: impl Into<String>) -> NormalizeError {
    NormalizeError::MalformedProviderResponse(message.into())
}

/// Convert a provider score into the canonical 0-100 range
fn canonical_score(raw: f64) -> f64 {
    (raw / PROVIDER_SCORE_MAX * 100.0).clamp(0.0, 100.0)
}

fn required<'a>(obj: &'a Value, key: &str, context: &str) -> Result<&'a Value> {
    obj.get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| malformed(format!("missing `{}` in {}", key, context)))
}

fn required_score(obj: &Value, key: &str, context: &str) -> Result<f64> {
    let value = required(obj, key, context)?;
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .map(canonical_score)
        .ok_or_else(|| malformed(format!("`{}` in {} is not a number: {}", key, context, value)))
}

fn required_str<'a>(obj: &'a Value, key: &str, context: &str) -> Result<&'a str> {
    let value = required(obj, key, context)?;
    value
        .as_str()
        .ok_or_else(|| malformed(format!("`{}` in {} is not a string", key, context)))
}

fn required_array<'a>(obj: &'a Value, key: &str, context: &str) -> Result<&'a Vec<Value>> {
    let value = required(obj, key, context)?;
    value
        .as_array()
        .ok_or_else(|| malformed(format!("`{}` in {} is not a list", key, context)))
}

/// Numeric value at `path`, if present and numeric
fn optional_score(root: &Value, path: &[&str]) -> Option<f64> {
    let mut node = root;
    for key in path {
        node = node.get(key)?;
    }
    node.as_f64().filter(|v| v.is_finite()).map(canonical_score)
}

/// Normalize a raw SpeechAce scoring response
pub fn normalize(raw: &Value, target_text: &str, bands: &CefrBands) -> Result<PronunciationResult> {
    let text_score = required(raw, "text_score", "response")?;
    let word_list = required_array(text_score, "word_score_list", "text_score")?;

    let words = word_list
        .iter()
        .enumerate()
        .map(|(i, word)| normalize_word(word, i))
        .collect::<Result<Vec<_>>>()?;

    let target_tokens = target_text.split_whitespace().count();
    if target_tokens != words.len() {
        tracing::warn!(
            word_count = words.len(),
            target_tokens = target_tokens,
            "Scored word count differs from target text token count"
        );
    }

    let overall_score = utterance_score(raw).unwrap_or_else(|| mean_word_score(&words));

    let provider_cefr_level = text_score
        .get("cefr_score")
        .and_then(|c| c.get("pronunciation"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let provider_status = raw.get("status").and_then(Value::as_str).map(str::to_string);

    tracing::debug!(
        word_count = words.len(),
        overall_score = overall_score,
        "Normalized scoring response"
    );

    Ok(PronunciationResult {
        target_text: target_text.to_string(),
        words,
        overall_score,
        cefr_level: bands.level_for(overall_score),
        provider_cefr_level,
        provider_status,
    })
}

/// Provider-supplied utterance score, first match wins
fn utterance_score(raw: &Value) -> Option<f64> {
    optional_score(raw, &["text_score", "speechace_score", "pronunciation"])
        .or_else(|| optional_score(raw, &["speechace_score", "pronunciation"]))
        .or_else(|| optional_score(raw, &["text_score", "quality_score"]))
}

fn mean_word_score(words: &[WordScore]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    words.iter().map(|w| w.quality_score).sum::<f64>() / words.len() as f64
}

fn normalize_word(word: &Value, index: usize) -> Result<WordScore> {
    let context = format!("word {}", index);
    let text = required_str(word, "word", &context)?.to_string();
    let quality_score = required_score(word, "quality_score", &context)?;

    let mut phones = required_array(word, "phone_score_list", &context)?
        .iter()
        .enumerate()
        .map(|(i, phone)| normalize_phone(phone, &format!("{} phone {}", context, i)))
        .collect::<Result<Vec<_>>>()?
        .into_iter();

    let syllable_list = match word.get("syllable_score_list") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(list)) => list.as_slice(),
        Some(_) => {
            return Err(malformed(format!(
                "`syllable_score_list` in {} is not a list",
                context
            )))
        }
    };

    if syllable_list.is_empty() {
        return Ok(WordScore {
            word: text.clone(),
            quality_score,
            syllables: vec![SyllableScore {
                letters: text,
                quality_score,
                phones: positioned(phones.collect()),
            }],
        });
    }

    let mut syllables = Vec::with_capacity(syllable_list.len());
    for (i, syllable) in syllable_list.iter().enumerate() {
        let syllable_context = format!("{} syllable {}", context, i);
        let letters = required_str(syllable, "letters", &syllable_context)?.to_string();
        let syllable_score = required_score(syllable, "quality_score", &syllable_context)?;
        let phone_count = required(syllable, "phone_count", &syllable_context)?
            .as_u64()
            .ok_or_else(|| {
                malformed(format!(
                    "`phone_count` in {} is not a count",
                    syllable_context
                ))
            })? as usize;

        let owned: Vec<PhoneScore> = phones.by_ref().take(phone_count).collect();
        if owned.len() != phone_count {
            return Err(malformed(format!(
                "{} claims {} phones but only {} remain",
                syllable_context,
                phone_count,
                owned.len()
            )));
        }

        syllables.push(SyllableScore {
            letters,
            quality_score: syllable_score,
            phones: positioned(owned),
        });
    }

    let leftover = phones.count();
    if leftover > 0 {
        return Err(malformed(format!(
            "{} has {} phones not covered by any syllable",
            context, leftover
        )));
    }

    Ok(WordScore {
        word: text,
        quality_score,
        syllables,
    })
}

fn normalize_phone(phone: &Value, context: &str) -> Result<PhoneScore> {
    Ok(PhoneScore {
        phone: required_str(phone, "phone", context)?.to_string(),
        quality_score: required_score(phone, "quality_score", context)?,
        sound_most_like: phone
            .get("sound_most_like")
            .and_then(Value::as_str)
            .map(str::to_string),
        position: 0,
    })
}

/// Renumber phone positions relative to their syllable
fn positioned(mut phones: Vec<PhoneScore>) -> Vec<PhoneScore> {
    for (i, phone) in phones.iter_mut().enumerate() {
        phone.position = i;
    }
    phones
}
