//! Phone aggregator
//!
//! Flattens every phone of a result into one utterance-ordered sequence, then
//! buckets it by label. No scores are recomputed here.

use crate::models::{PhoneGroups, PhoneOccurrence, PronunciationResult};

/// Group every phone in `result` by its label
///
/// Buckets appear in the order their label was first met, and each bucket
/// lists its occurrences in utterance order.
pub fn group_by_phone(result: &PronunciationResult) -> PhoneGroups {
    let mut groups = PhoneGroups::new();
    let mut utterance_index = 0;

    for (word_index, word) in result.words.iter().enumerate() {
        for (syllable_index, syllable) in word.syllables.iter().enumerate() {
            for phone in &syllable.phones {
                groups.push(PhoneOccurrence {
                    word_index,
                    syllable_index,
                    utterance_index,
                    word: word.word.clone(),
                    score: phone.clone(),
                });
                utterance_index += 1;
            }
        }
    }

    groups
}
