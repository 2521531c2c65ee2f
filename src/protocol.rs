//! Wire protocol
//!
//! JSON text frames exchanged over the WebSocket, tagged with a `type` field.
//! Clients identify themselves first (teacher or student); the room then
//! pushes poll, result, and countdown events for as long as the connection
//! stays registered.

use crate::poll::{CompletedPoll, OptionSpec, Poll, ResultsMap};
use serde::{Deserialize, Serialize};

/// Error code for malformed or out-of-order requests.
pub const ERROR_INVALID_REQUEST: &str = "invalid_request";
/// Error code for commands the participant's role does not permit.
pub const ERROR_FORBIDDEN: &str = "forbidden";
/// Error code for votes that cannot be accepted.
pub const ERROR_VOTE_REJECTED: &str = "vote_rejected";

/// Participant role within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
}

/// Frames sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Identify this connection as the session's teacher
    JoinTeacher { name: String },
    /// Identify this connection as a student
    JoinStudent { name: String },
    /// Start a new poll (teacher only); replaces any active poll
    #[serde(rename_all = "camelCase")]
    CreatePoll {
        question: String,
        options: Vec<OptionSpec>,
        duration_ms: u64,
    },
    /// Cast a vote for the active poll by option text (student only)
    SubmitAnswer { option: String },
    /// Send a chat message to everyone in the session
    Chat { text: String },
    /// Request the list of completed polls
    History,
    /// Application-level heartbeat
    Ping,
}

/// Frames pushed by the server.
///
/// For any given poll, `poll_created` is delivered before that poll's
/// `results_updated` and `time_tick` frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Registration acknowledgement
    #[serde(rename_all = "camelCase")]
    Joined { participant_id: String, role: Role },
    /// A new poll has started
    PollCreated { poll: Poll },
    /// Full replacement of the live results for the active poll
    ResultsUpdated { results: ResultsMap },
    /// Countdown update, remaining milliseconds clamped at zero
    #[serde(rename_all = "camelCase")]
    TimeTick { remaining_ms: u64 },
    /// The active poll's countdown expired
    #[serde(rename_all = "camelCase")]
    PollEnded {
        poll_id: String,
        results: ResultsMap,
    },
    /// Chat relayed to every participant
    ChatMessage {
        sender: String,
        text: String,
        ts: i64,
    },
    /// Completed polls, newest first
    History { polls: Vec<CompletedPoll> },
    /// Heartbeat response
    Pong,
    /// Request-level failure; the connection stays open
    Error { code: String, message: String },
}

impl ServerMessage {
    /// Build an error frame from a code and anything displayable.
    pub fn error(code: &str, message: impl std::fmt::Display) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}
