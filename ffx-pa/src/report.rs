//! Plain-text rendering of an analysis for the `ffx-analyze` CLI

use std::fmt::Write;

use crate::models::{FeedbackOutcome, PhoneGroups, PronunciationResult};

const PASS: &str = "✓";
const FAIL: &str = "✗";

fn mark(score: f64, threshold: f64) -> &'static str {
    if score < threshold {
        FAIL
    } else {
        PASS
    }
}

/// Word → syllable → phone breakdown with pass/fail marks
pub fn render_result(result: &PronunciationResult, threshold: f64) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Target: {}", result.target_text);
    let _ = write!(
        out,
        "Overall: {:.1}  CEFR: {}",
        result.overall_score, result.cefr_level
    );
    if let Some(provider_level) = &result.provider_cefr_level {
        let _ = write!(out, " (provider: {})", provider_level);
    }
    out.push('\n');

    for word in &result.words {
        let _ = writeln!(
            out,
            "\n{} {} {:.0}",
            mark(word.quality_score, threshold),
            word.word,
            word.quality_score
        );
        for syllable in &word.syllables {
            let _ = writeln!(
                out,
                "    {} {} {:.0}",
                mark(syllable.quality_score, threshold),
                syllable.letters,
                syllable.quality_score
            );
            for phone in &syllable.phones {
                let _ = write!(
                    out,
                    "        {} /{}/ {:.0}",
                    mark(phone.quality_score, threshold),
                    phone.phone,
                    phone.quality_score
                );
                match &phone.sound_most_like {
                    Some(like) if like != &phone.phone => {
                        let _ = write!(out, " (sounded like /{}/)", like);
                    }
                    _ => {}
                }
                out.push('\n');
            }
        }
    }

    out
}

/// Per-phone table, in first-seen order
pub fn render_phone_summary(groups: &PhoneGroups, threshold: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:>5} {:>7}  sounds like", "phone", "count", "average");

    for summary in groups.summaries() {
        let _ = writeln!(
            out,
            "{:<8} {:>5} {:>7.0}{} {}",
            summary.phone,
            summary.occurrences,
            summary.average_quality_score,
            if summary.average_quality_score < threshold { "*" } else { " " },
            summary.sounds_most_like.join(", ")
        );
    }

    out
}

pub fn render_feedback(feedback: &FeedbackOutcome) -> String {
    match feedback {
        FeedbackOutcome::Available {
            cheering_message,
            feedback,
        } => format!("{}\n\n{}\n", cheering_message, feedback),
        FeedbackOutcome::Unavailable { reason, message } => {
            format!("Feedback unavailable ({:?}): {}\n", reason, message)
        }
        FeedbackOutcome::Skipped => String::new(),
    }
}
