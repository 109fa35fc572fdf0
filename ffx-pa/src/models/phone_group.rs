//! Phone-keyed index over a pronunciation result

use crate::models::pronunciation::PhoneScore;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// One phone instance plus where it sat in the utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneOccurrence {
    pub word_index: usize,
    pub syllable_index: usize,
    /// Index of the phone across the whole utterance
    pub utterance_index: usize,
    pub word: String,
    pub score: PhoneScore,
}

/// All occurrences of one phone label, in first-seen order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneGroup {
    pub phone: String,
    pub occurrences: Vec<PhoneOccurrence>,
}

impl PhoneGroup {
    /// Unweighted mean of the occurrence scores (0 for an empty group)
    pub fn average_score(&self) -> f64 {
        if self.occurrences.is_empty() {
            return 0.0;
        }
        let total: f64 = self.occurrences.iter().map(|o| o.score.quality_score).sum();
        total / self.occurrences.len() as f64
    }

    /// Distinct confusions reported for this phone, sorted
    pub fn sounds_most_like(&self) -> Vec<String> {
        self.occurrences
            .iter()
            .filter_map(|o| o.score.sound_most_like.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Occurrences ordered lowest score first; ties keep utterance order
    pub fn worst_first(&self) -> Vec<&PhoneOccurrence> {
        let mut occurrences: Vec<&PhoneOccurrence> = self.occurrences.iter().collect();
        occurrences.sort_by(|a, b| a.score.quality_score.total_cmp(&b.score.quality_score));
        occurrences
    }

    pub fn summary(&self) -> PhoneSummary {
        PhoneSummary {
            phone: self.phone.clone(),
            occurrences: self.occurrences.len(),
            average_quality_score: self.average_score().round(),
            sounds_most_like: self.sounds_most_like(),
        }
    }
}

/// Compact per-phone view used in responses and prompts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneSummary {
    pub phone: String,
    pub occurrences: usize,
    pub average_quality_score: f64,
    pub sounds_most_like: Vec<String>,
}

/// Ordered mapping from phone label to its occurrences
///
/// Iteration follows the order labels were first met in the utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhoneGroups {
    groups: Vec<PhoneGroup>,
    index: HashMap<String, usize>,
}

impl PhoneGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an occurrence to its label's bucket, opening the bucket if new
    pub(crate) fn push(&mut self, occurrence: PhoneOccurrence) {
        match self.index.get(&occurrence.score.phone) {
            Some(&slot) => self.groups[slot].occurrences.push(occurrence),
            None => {
                let phone = occurrence.score.phone.clone();
                self.index.insert(phone.clone(), self.groups.len());
                self.groups.push(PhoneGroup {
                    phone,
                    occurrences: vec![occurrence],
                });
            }
        }
    }

    pub fn get(&self, phone: &str) -> Option<&PhoneGroup> {
        self.index.get(phone).map(|&slot| &self.groups[slot])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PhoneGroup> {
        self.groups.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.phone.as_str())
    }

    /// Number of distinct phone labels
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total phone instances across all buckets
    pub fn occurrence_count(&self) -> usize {
        self.groups.iter().map(|g| g.occurrences.len()).sum()
    }

    pub fn summaries(&self) -> Vec<PhoneSummary> {
        self.groups.iter().map(PhoneGroup::summary).collect()
    }

    /// The `n` groups with the lowest average score; ties keep first-seen order
    pub fn lowest(&self, n: usize) -> Vec<&PhoneGroup> {
        let mut groups: Vec<&PhoneGroup> = self.groups.iter().collect();
        groups.sort_by(|a, b| a.average_score().total_cmp(&b.average_score()));
        groups.truncate(n);
        groups
    }
}

impl<'a> IntoIterator for &'a PhoneGroups {
    type Item = &'a PhoneGroup;
    type IntoIter = std::slice::Iter<'a, PhoneGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}
