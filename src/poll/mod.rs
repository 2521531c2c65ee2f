//! Live poll data model, aggregation, and authoring.

pub mod aggregate;
pub mod draft;
pub mod history;
pub mod types;

pub use aggregate::{countdown_secs, percentage_for, tally, total_votes, votes_for, OptionTally};
pub use draft::{DraftError, PollDraft};
pub use history::{CompletedPoll, PollHistory};
pub use types::{
    now_millis, CreatePollRequest, OptionSpec, Poll, PollError, PollOption, ResultsMap,
    MAX_OPTIONS,
};
