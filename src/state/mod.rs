//! Client-side session state
//!
//! An owned, explicit model of what a dashboard renders: the current poll,
//! the live results, and the countdown. One entry point per inbound event
//! type replaces ambient store mutation; every display value is derived on
//! demand from (current poll, current results) through the aggregator, so
//! there is no hidden accumulator to drift out of sync.
//!
//! The model assumes the room's ordering guarantee (a poll's creation event
//! arrives before that poll's result and tick events) and performs no
//! reconciliation if it is violated.

use crate::poll::{aggregate, OptionTally, Poll, PollOption, ResultsMap};
use crate::protocol::ServerMessage;

/// What a connected dashboard knows about the session.
#[derive(Debug, Default)]
pub struct DashboardState {
    current_poll: Option<Poll>,
    results: ResultsMap,
    remaining_ms: u64,
}

impl DashboardState {
    /// Empty state: no poll, no results, no countdown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound event. Frames that carry no session state (chat,
    /// pong, errors) leave the model untouched.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::PollCreated { poll } => {
                self.current_poll = Some(poll.clone());
                self.results = ResultsMap::new();
                self.remaining_ms = poll.duration_ms;
            }
            ServerMessage::ResultsUpdated { results } => {
                self.results = results.clone();
            }
            ServerMessage::TimeTick { remaining_ms } => {
                self.remaining_ms = *remaining_ms;
            }
            ServerMessage::PollEnded { results, .. } => {
                // The ended poll stays visible with its final results.
                self.results = results.clone();
                self.remaining_ms = 0;
            }
            _ => {}
        }
    }

    /// The poll currently displayed, if any.
    pub fn current_poll(&self) -> Option<&Poll> {
        self.current_poll.as_ref()
    }

    /// The live results for the current poll.
    pub fn results(&self) -> &ResultsMap {
        &self.results
    }

    /// Remaining milliseconds on the countdown.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Seconds left, rounded up for display.
    pub fn countdown_secs(&self) -> u64 {
        aggregate::countdown_secs(self.remaining_ms)
    }

    /// Number of respondents so far.
    pub fn total_votes(&self) -> usize {
        aggregate::total_votes(&self.results)
    }

    /// Votes cast for one option of the current poll.
    pub fn votes_for(&self, option: &PollOption) -> usize {
        aggregate::votes_for(option, &self.results)
    }

    /// Whole percentage of respondents who chose one option.
    pub fn percentage_for(&self, option: &PollOption) -> u8 {
        aggregate::percentage_for(option, &self.results)
    }

    /// Display rows for every option of the current poll, or empty when no
    /// poll is active.
    pub fn tallies(&self) -> Vec<OptionTally> {
        match &self.current_poll {
            Some(poll) => aggregate::tally(poll, &self.results),
            None => Vec::new(),
        }
    }
}
