//! Coaching feedback outcome
//!
//! Feedback is optional decoration on a pronunciation result. When it cannot
//! be produced the response says so explicitly instead of omitting it.

use serde::{Deserialize, Serialize};

/// Why feedback text is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    NotConfigured,
    Timeout,
    ProviderError,
}

/// Result of asking the language model for coaching text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Available {
        cheering_message: String,
        feedback: String,
    },
    Unavailable {
        reason: UnavailableReason,
        message: String,
    },
    /// Caller did not ask for feedback
    Skipped,
}

impl FeedbackOutcome {
    pub fn unavailable(reason: UnavailableReason, message: impl Into<String>) -> Self {
        FeedbackOutcome::Unavailable {
            reason,
            message: message.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FeedbackOutcome::Available { .. })
    }
}
