//! Poll authoring
//!
//! The teacher-side option editor: a small state machine over a question,
//! 1 to 4 option rows, and a countdown duration. The draft never holds more
//! than [`MAX_OPTIONS`] rows, and submission filters out rows whose trimmed
//! text is blank.

use super::types::{CreatePollRequest, OptionSpec, MAX_OPTIONS};
use thiserror::Error;

/// Default countdown for a new draft, matching the editor's initial selection.
pub const DEFAULT_DURATION_MS: u64 = 60_000;

/// Errors surfaced by the draft editor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("a poll is limited to 4 options")]
    OptionLimit,
    #[error("no option at index {0}")]
    BadIndex(usize),
    #[error("a question and at least one non-blank option are required")]
    Incomplete,
}

/// One editable option row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOption {
    pub text: String,
    pub is_correct: bool,
}

/// A poll being authored.
///
/// Starts with a single blank row flagged correct. Correctness is a per-row
/// flag with no mutual exclusion across rows, despite the yes/no radio the
/// original editor renders per row.
#[derive(Debug, Clone)]
pub struct PollDraft {
    question: String,
    options: Vec<DraftOption>,
    duration_ms: u64,
}

impl Default for PollDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl PollDraft {
    /// Create a fresh draft: empty question, one blank default-correct option.
    pub fn new() -> Self {
        Self {
            question: String::new(),
            options: vec![DraftOption {
                text: String::new(),
                is_correct: true,
            }],
            duration_ms: DEFAULT_DURATION_MS,
        }
    }

    /// Current question text.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Current option rows, in display order.
    pub fn options(&self) -> &[DraftOption] {
        &self.options
    }

    /// Current countdown duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Replace the question text.
    pub fn set_question(&mut self, question: impl Into<String>) {
        self.question = question.into();
    }

    /// Replace the countdown duration.
    pub fn set_duration_ms(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
    }

    /// Append a blank, non-correct option row. Rejected once the draft holds
    /// [`MAX_OPTIONS`] rows.
    pub fn add_option(&mut self) -> Result<(), DraftError> {
        if self.options.len() >= MAX_OPTIONS {
            return Err(DraftError::OptionLimit);
        }
        self.options.push(DraftOption {
            text: String::new(),
            is_correct: false,
        });
        Ok(())
    }

    /// Replace the text of row `index`.
    pub fn set_option_text(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), DraftError> {
        let option = self
            .options
            .get_mut(index)
            .ok_or(DraftError::BadIndex(index))?;
        option.text = text.into();
        Ok(())
    }

    /// Toggle the correctness flag of row `index` only; other rows are left
    /// untouched.
    pub fn set_correct(&mut self, index: usize, is_correct: bool) -> Result<(), DraftError> {
        let option = self
            .options
            .get_mut(index)
            .ok_or(DraftError::BadIndex(index))?;
        option.is_correct = is_correct;
        Ok(())
    }

    /// Whether the draft can be submitted: non-empty question and at least
    /// one option with non-blank trimmed text.
    pub fn can_submit(&self) -> bool {
        !self.question.is_empty() && self.options.iter().any(|o| !o.text.trim().is_empty())
    }

    /// Turn the draft into a create-poll request.
    ///
    /// Rows with blank trimmed text are filtered out of the request. On
    /// success the editor resets to a single blank, default-correct row; the
    /// duration selection is kept.
    pub fn submit(&mut self) -> Result<CreatePollRequest, DraftError> {
        if !self.can_submit() {
            return Err(DraftError::Incomplete);
        }
        let options = self
            .options
            .iter()
            .filter(|o| !o.text.trim().is_empty())
            .map(|o| OptionSpec {
                text: o.text.clone(),
                is_correct: o.is_correct,
            })
            .collect();
        let request = CreatePollRequest {
            question: std::mem::take(&mut self.question),
            options,
            duration_ms: self.duration_ms,
        };
        self.options = vec![DraftOption {
            text: String::new(),
            is_correct: true,
        }];
        Ok(request)
    }
}
