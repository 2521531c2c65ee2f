//! WebSocket connection handling
//!
//! One task pair per connection: a writer task drains the participant's
//! outbound queue into the socket, while the read loop parses inbound frames
//! and dispatches them to the room. Registration is scoped to the connection
//! through [`RoomGuard`], so every exit path deregisters the participant.

use super::AppState;
use crate::protocol::{
    ClientMessage, Role, ServerMessage, ERROR_FORBIDDEN, ERROR_INVALID_REQUEST,
    ERROR_VOTE_REJECTED,
};
use crate::room::{spawn_timer, Room, RoomError, RoomGuard};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Upgrade `/ws` requests and hand the socket to the session loop.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.room))
}

async fn handle_socket(socket: WebSocket, room: Arc<Room>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(room.queue_size());

    // Writer task: everything the room (or this handler) queues goes out as
    // one JSON text frame.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(error) => {
                    warn!(%error, "failed to serialize outbound frame");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut guard: Option<RoomGuard> = None;
    while let Some(Ok(message)) = ws_rx.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // Binary, ping, pong frames carry nothing at this layer.
            _ => continue,
        };

        let frame = match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(frame) => frame,
            Err(error) => {
                debug!(%error, "unparseable client frame");
                queue(&tx, ServerMessage::error(ERROR_INVALID_REQUEST, error)).await;
                continue;
            }
        };

        if let Err(reply) = dispatch(frame, &room, &tx, &mut guard) {
            queue(&tx, reply).await;
        }
    }

    // RoomGuard::drop deregisters the participant.
    drop(guard);
    writer.abort();
}

/// Apply one client frame, queueing direct replies. Errors come back as the
/// error frame to send.
fn dispatch(
    frame: ClientMessage,
    room: &Arc<Room>,
    tx: &mpsc::Sender<ServerMessage>,
    guard: &mut Option<RoomGuard>,
) -> Result<(), ServerMessage> {
    match frame {
        ClientMessage::JoinTeacher { name } => join(room, &name, Role::Teacher, tx, guard),
        ClientMessage::JoinStudent { name } => join(room, &name, Role::Student, tx, guard),
        ClientMessage::CreatePoll {
            question,
            options,
            duration_ms,
        } => {
            let participant_id = joined(guard)?;
            let request = crate::poll::CreatePollRequest {
                question,
                options,
                duration_ms,
            };
            let poll = room
                .create_poll(participant_id, request)
                .map_err(to_error_frame)?;
            spawn_timer(room.clone(), poll.id);
            Ok(())
        }
        ClientMessage::SubmitAnswer { option } => {
            let participant_id = joined(guard)?;
            room.submit_answer(participant_id, &option)
                .map_err(to_error_frame)
        }
        ClientMessage::Chat { text } => {
            let participant_id = joined(guard)?;
            room.chat(participant_id, &text).map_err(to_error_frame)
        }
        ClientMessage::History => {
            let participant_id = joined(guard)?;
            let polls = room.history(participant_id).map_err(to_error_frame)?;
            try_queue(tx, ServerMessage::History { polls });
            Ok(())
        }
        ClientMessage::Ping => {
            try_queue(tx, ServerMessage::Pong);
            Ok(())
        }
    }
}

fn join(
    room: &Arc<Room>,
    name: &str,
    role: Role,
    tx: &mpsc::Sender<ServerMessage>,
    guard: &mut Option<RoomGuard>,
) -> Result<(), ServerMessage> {
    if guard.is_some() {
        return Err(ServerMessage::error(
            ERROR_INVALID_REQUEST,
            RoomError::AlreadyJoined,
        ));
    }
    // The room queues the `joined` acknowledgement (and any mid-poll
    // catch-up frames) on this connection's channel.
    let participant_id = room
        .join(name, role, tx.clone())
        .map_err(to_error_frame)?;
    *guard = Some(RoomGuard::new(room.clone(), participant_id));
    Ok(())
}

fn joined(guard: &Option<RoomGuard>) -> Result<&str, ServerMessage> {
    guard
        .as_ref()
        .map(|g| g.participant_id())
        .ok_or_else(|| ServerMessage::error(ERROR_INVALID_REQUEST, RoomError::NotJoined))
}

fn to_error_frame(error: RoomError) -> ServerMessage {
    let code = match &error {
        RoomError::TeacherOnly | RoomError::StudentOnly | RoomError::TeacherTaken => {
            ERROR_FORBIDDEN
        }
        RoomError::NoActivePoll | RoomError::AlreadyVoted | RoomError::UnknownOption => {
            ERROR_VOTE_REJECTED
        }
        RoomError::NotJoined | RoomError::AlreadyJoined | RoomError::InvalidPoll(_) => {
            ERROR_INVALID_REQUEST
        }
    };
    ServerMessage::error(code, error)
}

/// Queue a direct reply on the participant's own channel so it keeps order
/// with room broadcasts.
async fn queue(tx: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
    if tx.send(message).await.is_err() {
        debug!("connection writer gone, dropping reply");
    }
}

fn try_queue(tx: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
    if tx.try_send(message).is_err() {
        warn!("connection queue full, dropping reply");
    }
}
