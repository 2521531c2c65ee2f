//! Poll history
//!
//! Bounded record of completed polls with their final results.

use super::types::{now_millis, Poll, ResultsMap};
use serde::{Deserialize, Serialize};

/// A poll that has ended, with the results frozen at the time it ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPoll {
    pub poll: Poll,
    pub results: ResultsMap,
    /// When the poll ended (Unix ms)
    pub ended_at: i64,
}

/// In-memory store of completed polls, oldest evicted past the limit.
#[derive(Debug)]
pub struct PollHistory {
    entries: Vec<CompletedPoll>,
    limit: usize,
}

impl PollHistory {
    /// Create a history keeping at most `limit` completed polls.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
        }
    }

    /// Archive a poll with its final results.
    pub fn record(&mut self, poll: Poll, results: ResultsMap) {
        self.entries.push(CompletedPoll {
            poll,
            results,
            ended_at: now_millis(),
        });
        if self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(..overflow);
        }
    }

    /// Completed polls, newest first.
    pub fn entries(&self) -> Vec<CompletedPoll> {
        self.entries.iter().rev().cloned().collect()
    }

    /// Number of completed polls retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no poll has completed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
