//! Normalized pronunciation result: word → syllables → phones

use ffx_common::CefrLevel;
use serde::{Deserialize, Serialize};

/// Score for a single phone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneScore {
    /// Phone label as reported by the provider (e.g. "b", "uw")
    pub phone: String,
    /// Canonical 0-100 score
    pub quality_score: f64,
    /// Phone the learner's sound was closest to, when the provider says
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_most_like: Option<String>,
    /// Index within the owning syllable
    pub position: usize,
}

impl PhoneScore {
    pub fn needs_work(&self, threshold: f64) -> bool {
        self.quality_score < threshold
    }
}

/// Score for a syllable and its phones, in spoken order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyllableScore {
    pub letters: String,
    pub quality_score: f64,
    pub phones: Vec<PhoneScore>,
}

/// Score for a word and its syllables, in spoken order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordScore {
    pub word: String,
    pub quality_score: f64,
    pub syllables: Vec<SyllableScore>,
}

impl WordScore {
    /// All phones of the word in spoken order
    pub fn phones(&self) -> impl Iterator<Item = &PhoneScore> {
        self.syllables.iter().flat_map(|s| s.phones.iter())
    }
}

/// Normalized scoring artifact for one utterance
///
/// Words keep the provider's order, which follows the target text. Every
/// score is within 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PronunciationResult {
    pub target_text: String,
    pub words: Vec<WordScore>,
    pub overall_score: f64,
    pub cefr_level: CefrLevel,
    /// The provider's own CEFR estimate, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_cefr_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<String>,
}

impl PronunciationResult {
    /// Every phone in utterance order
    pub fn phones(&self) -> impl Iterator<Item = &PhoneScore> {
        self.words.iter().flat_map(|w| w.phones())
    }

    pub fn phone_count(&self) -> usize {
        self.phones().count()
    }

    /// The `n` lowest-scoring words; ties keep utterance order
    pub fn lowest_words(&self, n: usize) -> Vec<&WordScore> {
        let mut words: Vec<&WordScore> = self.words.iter().collect();
        words.sort_by(|a, b| a.quality_score.total_cmp(&b.quality_score));
        words.truncate(n);
        words
    }
}
