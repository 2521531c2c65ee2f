//! Session room engine
//!
//! Owns the authoritative session state: who is connected, the active poll
//! with its live results and deadline, and the history of completed polls.
//! All mutation happens under one lock, and every frame that depends on the
//! active poll is broadcast while that lock is held, so subscribers observe
//! a poll's `poll_created` frame before any of its `results_updated` or
//! `time_tick` frames.

use crate::config::RoomConfig;
use crate::poll::{
    now_millis, CompletedPoll, CreatePollRequest, Poll, PollError, PollHistory, ResultsMap,
};
use crate::protocol::{Role, ServerMessage};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Room command errors, each mapped to a wire error code by the gateway.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("join first")]
    NotJoined,
    #[error("already joined")]
    AlreadyJoined,
    #[error("the session already has a teacher")]
    TeacherTaken,
    #[error("only the teacher can do that")]
    TeacherOnly,
    #[error("only students can vote")]
    StudentOnly,
    #[error("no poll is active")]
    NoActivePoll,
    #[error("this participant has already voted")]
    AlreadyVoted,
    #[error("option does not match the active poll")]
    UnknownOption,
    #[error(transparent)]
    InvalidPoll(#[from] PollError),
}

/// A registered connection.
#[derive(Debug)]
struct Participant {
    name: String,
    role: Role,
    sender: mpsc::Sender<ServerMessage>,
}

/// The active poll plus everything that expires with it.
#[derive(Debug)]
struct ActivePoll {
    poll: Poll,
    results: ResultsMap,
    deadline: Instant,
}

#[derive(Debug)]
struct RoomInner {
    participants: HashMap<String, Participant>,
    teacher_id: Option<String>,
    active: Option<ActivePoll>,
    history: PollHistory,
}

/// One live session: participants, at most one active poll, poll history.
#[derive(Debug)]
pub struct Room {
    inner: RwLock<RoomInner>,
    config: RoomConfig,
}

impl Room {
    pub fn new(config: RoomConfig) -> Self {
        let history = PollHistory::new(config.history_limit);
        Self {
            inner: RwLock::new(RoomInner {
                participants: HashMap::new(),
                teacher_id: None,
                active: None,
                history,
            }),
            config,
        }
    }

    /// Countdown broadcast interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms)
    }

    /// Outbound queue size for new connections.
    pub fn queue_size(&self) -> usize {
        self.config.queue_size
    }

    /// Register a connection under a fresh participant ID.
    ///
    /// At most one teacher is admitted per session. The new participant's
    /// queue receives the `joined` acknowledgement first; a participant
    /// joining mid-poll is then sent the active poll, its live results, and
    /// the current countdown.
    pub fn join(
        &self,
        name: &str,
        role: Role,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<String, RoomError> {
        let mut inner = self.inner.write();
        if role == Role::Teacher && inner.teacher_id.is_some() {
            return Err(RoomError::TeacherTaken);
        }

        let participant_id = format!("p_{}", uuid::Uuid::new_v4().simple());
        send_to(
            &sender,
            ServerMessage::Joined {
                participant_id: participant_id.clone(),
                role,
            },
        );
        if let Some(active) = &inner.active {
            let remaining = remaining_ms(active.deadline);
            send_to(
                &sender,
                ServerMessage::PollCreated {
                    poll: active.poll.clone(),
                },
            );
            send_to(
                &sender,
                ServerMessage::ResultsUpdated {
                    results: active.results.clone(),
                },
            );
            send_to(&sender, ServerMessage::TimeTick {
                remaining_ms: remaining,
            });
        }
        inner.participants.insert(
            participant_id.clone(),
            Participant {
                name: name.to_string(),
                role,
                sender,
            },
        );
        if role == Role::Teacher {
            inner.teacher_id = Some(participant_id.clone());
        }

        info!(participant_id = %participant_id, ?role, name, "participant joined");
        Ok(participant_id)
    }

    /// Deregister a connection. Safe to call twice.
    pub fn leave(&self, participant_id: &str) {
        let mut inner = self.inner.write();
        if inner.participants.remove(participant_id).is_some() {
            if inner.teacher_id.as_deref() == Some(participant_id) {
                inner.teacher_id = None;
            }
            info!(participant_id = %participant_id, "participant left");
        }
    }

    /// Number of registered participants.
    pub fn participant_count(&self) -> usize {
        self.inner.read().participants.len()
    }

    /// Start a new poll (teacher only). Any active poll is replaced: it is
    /// archived with the results it had, and its timer task goes stale.
    ///
    /// The `poll_created` broadcast happens under the same lock that installs
    /// the poll, ahead of any result or tick frame for it.
    pub fn create_poll(
        &self,
        participant_id: &str,
        request: CreatePollRequest,
    ) -> Result<Poll, RoomError> {
        let mut inner = self.inner.write();
        let participant = inner
            .participants
            .get(participant_id)
            .ok_or(RoomError::NotJoined)?;
        if participant.role != Role::Teacher {
            return Err(RoomError::TeacherOnly);
        }

        let poll = Poll::from_request(request)?;
        if let Some(replaced) = inner.active.take() {
            debug!(poll_id = %replaced.poll.id, "archiving replaced poll");
            inner.history.record(replaced.poll, replaced.results);
        }
        let deadline = Instant::now() + Duration::from_millis(poll.duration_ms);
        inner.active = Some(ActivePoll {
            poll: poll.clone(),
            results: ResultsMap::new(),
            deadline,
        });

        info!(poll_id = %poll.id, question = %poll.question, "poll created");
        broadcast(&inner, ServerMessage::PollCreated { poll: poll.clone() });
        Ok(poll)
    }

    /// Record a vote for the active poll (students only).
    ///
    /// The option must match one of the poll's option texts exactly, and
    /// each participant gets one vote per poll. Accepted votes trigger a
    /// full `results_updated` broadcast.
    pub fn submit_answer(&self, participant_id: &str, option: &str) -> Result<(), RoomError> {
        let mut inner = self.inner.write();
        let participant = inner
            .participants
            .get(participant_id)
            .ok_or(RoomError::NotJoined)?;
        if participant.role != Role::Student {
            return Err(RoomError::StudentOnly);
        }

        let active = inner.active.as_mut().ok_or(RoomError::NoActivePoll)?;
        if !active.poll.has_option(option) {
            return Err(RoomError::UnknownOption);
        }
        if active.results.contains_key(participant_id) {
            return Err(RoomError::AlreadyVoted);
        }
        active
            .results
            .insert(participant_id.to_string(), option.to_string());
        let results = active.results.clone();

        debug!(participant_id = %participant_id, option, "vote recorded");
        broadcast(&inner, ServerMessage::ResultsUpdated { results });
        Ok(())
    }

    /// Advance the countdown for `poll_id`.
    ///
    /// Returns the remaining milliseconds after broadcasting a `time_tick`,
    /// `Some(0)` after ending the poll, or `None` when `poll_id` is no longer
    /// the active poll (the caller's timer is stale and should stop).
    pub fn tick(&self, poll_id: &str) -> Option<u64> {
        let mut inner = self.inner.write();
        match &inner.active {
            Some(active) if active.poll.id == poll_id => {}
            _ => return None,
        }

        let remaining = inner
            .active
            .as_ref()
            .map(|active| remaining_ms(active.deadline))?;
        if remaining == 0 {
            let ended = inner.active.take()?;
            info!(poll_id = %ended.poll.id, votes = ended.results.len(), "poll ended");
            let message = ServerMessage::PollEnded {
                poll_id: ended.poll.id.clone(),
                results: ended.results.clone(),
            };
            inner.history.record(ended.poll, ended.results);
            broadcast(&inner, message);
            return Some(0);
        }

        broadcast(&inner, ServerMessage::TimeTick {
            remaining_ms: remaining,
        });
        Some(remaining)
    }

    /// Relay a chat message from a registered participant to everyone.
    pub fn chat(&self, participant_id: &str, text: &str) -> Result<(), RoomError> {
        let inner = self.inner.read();
        let participant = inner
            .participants
            .get(participant_id)
            .ok_or(RoomError::NotJoined)?;
        broadcast(
            &inner,
            ServerMessage::ChatMessage {
                sender: participant.name.clone(),
                text: text.to_string(),
                ts: now_millis(),
            },
        );
        Ok(())
    }

    /// Completed polls, newest first.
    pub fn history(&self, participant_id: &str) -> Result<Vec<CompletedPoll>, RoomError> {
        let inner = self.inner.read();
        if !inner.participants.contains_key(participant_id) {
            return Err(RoomError::NotJoined);
        }
        Ok(inner.history.entries())
    }

    /// Snapshot of the active poll's live results, for tests and inspection.
    pub fn active_results(&self) -> Option<ResultsMap> {
        self.inner
            .read()
            .active
            .as_ref()
            .map(|active| active.results.clone())
    }

    /// Counters for the status endpoint.
    pub fn stats(&self) -> RoomStats {
        let inner = self.inner.read();
        RoomStats {
            participants: inner.participants.len(),
            active_poll: inner.active.is_some(),
            votes: inner
                .active
                .as_ref()
                .map(|active| active.results.len())
                .unwrap_or(0),
            completed_polls: inner.history.len(),
        }
    }
}

/// Point-in-time counters describing a room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub participants: usize,
    pub active_poll: bool,
    pub votes: usize,
    pub completed_polls: usize,
}

/// Milliseconds until `deadline`, clamped at zero.
fn remaining_ms(deadline: Instant) -> u64 {
    deadline
        .saturating_duration_since(Instant::now())
        .as_millis() as u64
}

/// Fan a frame out to every registered participant. Slow consumers whose
/// queue is full miss the frame rather than stall the room.
fn broadcast(inner: &RoomInner, message: ServerMessage) {
    for (participant_id, participant) in &inner.participants {
        if participant.sender.try_send(message.clone()).is_err() {
            warn!(participant_id = %participant_id, "participant queue full, dropping frame");
        }
    }
}

fn send_to(sender: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
    if sender.try_send(message).is_err() {
        warn!("participant queue full, dropping frame");
    }
}

/// Drives a poll's countdown: one `time_tick` per interval until the
/// deadline passes, then the end-of-poll broadcast. The task stops on its
/// own once the poll it was started for is replaced or ended.
pub fn spawn_timer(room: Arc<Room>, poll_id: String) {
    let interval = room.tick_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick of a tokio interval fires immediately; skip it so
        // the countdown starts one interval after creation.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match room.tick(&poll_id) {
                Some(0) | None => break,
                Some(_) => {}
            }
        }
    });
}

/// Keeps a registration alive for the lifetime of a connection and releases
/// it on every exit path, panics included.
pub struct RoomGuard {
    room: Arc<Room>,
    participant_id: String,
}

impl RoomGuard {
    pub fn new(room: Arc<Room>, participant_id: String) -> Self {
        Self {
            room,
            participant_id,
        }
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        self.room.leave(&self.participant_id);
    }
}
