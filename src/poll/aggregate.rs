//! Result aggregation
//!
//! Pure functions deriving display values from a poll and its live results.
//! Everything here is computed fresh from (Poll, ResultsMap) on every call;
//! no accumulator state is kept anywhere.

use super::types::{Poll, PollOption, ResultsMap};
use serde::Serialize;

/// Count of votes cast for an option.
///
/// Matches by exact string equality on the option text; returns 0 for an
/// empty results map. Options sharing identical text each report the count
/// of that text rather than splitting it.
pub fn votes_for(option: &PollOption, results: &ResultsMap) -> usize {
    results.values().filter(|vote| *vote == &option.text).count()
}

/// Share of respondents who chose an option, as a whole percentage in [0, 100].
///
/// `round(votes / total * 100)` with round-half-up on the floating quotient,
/// where `total` is the number of respondents (entries in the map). Returns 0
/// when nobody has voted yet.
pub fn percentage_for(option: &PollOption, results: &ResultsMap) -> u8 {
    let total = results.len();
    if total == 0 {
        return 0;
    }
    let votes = votes_for(option, results);
    ((votes as f64 / total as f64) * 100.0).round() as u8
}

/// Total number of respondents.
pub fn total_votes(results: &ResultsMap) -> usize {
    results.len()
}

/// Seconds left on the countdown: `ceil(remaining_ms / 1000)`.
pub fn countdown_secs(remaining_ms: u64) -> u64 {
    remaining_ms.div_ceil(1000)
}

/// Per-option display row derived from the live results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    /// Option text
    pub text: String,
    /// Whether the option is flagged correct
    pub is_correct: bool,
    /// Votes cast for this option
    pub votes: usize,
    /// Whole percentage of respondents who chose it
    pub percentage: u8,
}

/// Tally every option of a poll against the live results, in display order.
pub fn tally(poll: &Poll, results: &ResultsMap) -> Vec<OptionTally> {
    poll.options
        .iter()
        .map(|option| OptionTally {
            text: option.text.clone(),
            is_correct: option.is_correct,
            votes: votes_for(option, results),
            percentage: percentage_for(option, results),
        })
        .collect()
}
