//! Poll data model
//!
//! Types shared between the authoring side, the room engine, and the wire
//! protocol: polls, options, and the live results mapping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Maximum number of options a poll may carry.
pub const MAX_OPTIONS: usize = 4;

/// Live results for the active poll: respondent ID -> exact chosen option text.
///
/// Votes are matched back to options by exact string equality on the option
/// text, so two options with identical text report identical figures.
pub type ResultsMap = HashMap<String, String>;

/// Validation errors for polls and create-poll requests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("poll question is required")]
    EmptyQuestion,
    #[error("poll must have at least one option")]
    NoOptions,
    #[error("poll cannot have more than 4 options")]
    TooManyOptions,
    #[error("option text is required")]
    BlankOption,
    #[error("poll duration must be positive")]
    ZeroDuration,
}

/// A single selectable option within a poll.
///
/// No cross-option invariant is enforced: any subset of a poll's options
/// (including none or all) may be flagged correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    /// Option text/label
    pub text: String,
    /// Whether this option is flagged as the correct answer
    #[serde(default)]
    pub is_correct: bool,
}

impl PollOption {
    /// Create a new poll option
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_correct: false,
        }
    }

    /// Flag as correct answer
    pub fn correct(mut self) -> Self {
        self.is_correct = true;
        self
    }
}

/// Option payload of a create-poll request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSpec {
    /// Option text/label
    pub text: String,
    /// Whether this option is flagged correct
    #[serde(default)]
    pub is_correct: bool,
}

/// Outbound command a teacher issues to start a poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    /// Question text
    pub question: String,
    /// Options in display order
    pub options: Vec<OptionSpec>,
    /// Countdown duration in milliseconds
    pub duration_ms: u64,
}

impl CreatePollRequest {
    /// Validate the request before it is turned into a poll.
    pub fn validate(&self) -> Result<(), PollError> {
        if self.question.trim().is_empty() {
            return Err(PollError::EmptyQuestion);
        }
        if self.options.is_empty() {
            return Err(PollError::NoOptions);
        }
        if self.options.len() > MAX_OPTIONS {
            return Err(PollError::TooManyOptions);
        }
        if self.options.iter().any(|o| o.text.trim().is_empty()) {
            return Err(PollError::BlankOption);
        }
        if self.duration_ms == 0 {
            return Err(PollError::ZeroDuration);
        }
        Ok(())
    }
}

/// A broadcast poll: one question, an ordered list of options, and a
/// countdown duration. Immutable once broadcast; replaced when a new poll is
/// created or the countdown expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Poll ID (unique identifier)
    pub id: String,
    /// Question text
    pub question: String,
    /// Options in display order
    pub options: Vec<PollOption>,
    /// Countdown duration in milliseconds
    pub duration_ms: u64,
    /// When the poll was created (Unix ms)
    pub created_at: i64,
}

impl Poll {
    /// Build a poll from a validated create-poll request.
    pub fn from_request(request: CreatePollRequest) -> Result<Self, PollError> {
        request.validate()?;
        Ok(Self {
            id: format!("poll_{}", uuid::Uuid::new_v4().simple()),
            question: request.question,
            options: request
                .options
                .into_iter()
                .map(|spec| PollOption {
                    text: spec.text,
                    is_correct: spec.is_correct,
                })
                .collect(),
            duration_ms: request.duration_ms,
            created_at: now_millis(),
        })
    }

    /// Whether the given text matches any option of this poll.
    pub fn has_option(&self, text: &str) -> bool {
        self.options.iter().any(|o| o.text == text)
    }
}

/// Get current time in milliseconds since Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
