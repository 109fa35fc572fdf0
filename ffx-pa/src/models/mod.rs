//! Data models for ffx-pa
//!
//! Everything downstream of the normalizer works on these types only; the
//! scoring provider's raw schema never leaves `services::normalizer`.

pub mod feedback;
pub mod phone_group;
pub mod pronunciation;

pub use feedback::{FeedbackOutcome, UnavailableReason};
pub use phone_group::{PhoneGroup, PhoneGroups, PhoneOccurrence, PhoneSummary};
pub use pronunciation::{PhoneScore, PronunciationResult, SyllableScore, WordScore};
