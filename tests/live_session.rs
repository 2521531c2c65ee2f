//! End-to-end session tests against a real gateway over WebSocket.

use futures_util::{SinkExt, StreamExt};
use pollroom::config::RoomConfig;
use pollroom::poll::OptionSpec;
use pollroom::protocol::{ClientMessage, Role, ServerMessage};
use pollroom::room::Room;
use pollroom::server::build_router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a gateway on an ephemeral port and return its address.
async fn start_gateway(room_config: RoomConfig) -> SocketAddr {
    let room = Arc::new(Room::new(room_config));
    let router = build_router(room);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("connect");
    ws
}

async fn send(ws: &mut WsClient, frame: &ClientMessage) {
    let json = serde_json::to_string(frame).expect("serialize");
    ws.send(Message::text(json)).await.expect("send");
}

/// Receive the next text frame, failing the test after 5 seconds.
async fn recv(ws: &mut WsClient) -> ServerMessage {
    let deadline = Duration::from_secs(5);
    loop {
        let message = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream closed")
            .expect("socket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("parse frame");
        }
    }
}

/// Receive frames until one matches, failing the test after 5 seconds.
async fn recv_until<F>(ws: &mut WsClient, mut matches: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    loop {
        let frame = recv(ws).await;
        if matches(&frame) {
            return frame;
        }
    }
}

async fn join(ws: &mut WsClient, name: &str, role: Role) -> String {
    let frame = match role {
        Role::Teacher => ClientMessage::JoinTeacher {
            name: name.to_string(),
        },
        Role::Student => ClientMessage::JoinStudent {
            name: name.to_string(),
        },
    };
    send(ws, &frame).await;
    match recv(ws).await {
        ServerMessage::Joined {
            participant_id,
            role: acked,
        } => {
            assert_eq!(acked, role);
            participant_id
        }
        other => panic!("expected joined ack, got {other:?}"),
    }
}

fn options(texts: &[(&str, bool)]) -> Vec<OptionSpec> {
    texts
        .iter()
        .map(|(text, is_correct)| OptionSpec {
            text: text.to_string(),
            is_correct: *is_correct,
        })
        .collect()
}

#[tokio::test]
async fn full_poll_lifecycle() {
    let addr = start_gateway(RoomConfig {
        tick_interval_ms: 100,
        ..RoomConfig::default()
    })
    .await;

    let mut teacher = connect(addr).await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    let mut carol = connect(addr).await;

    join(&mut teacher, "t", Role::Teacher).await;
    let alice_id = join(&mut alice, "alice", Role::Student).await;
    join(&mut bob, "bob", Role::Student).await;
    join(&mut carol, "carol", Role::Student).await;

    send(
        &mut teacher,
        &ClientMessage::CreatePoll {
            question: "2+2?".to_string(),
            options: options(&[("3", false), ("4", true)]),
            duration_ms: 2000,
        },
    )
    .await;

    // Everyone sees the poll before any of its results.
    let poll_id = match recv(&mut teacher).await {
        ServerMessage::PollCreated { poll } => {
            assert_eq!(poll.question, "2+2?");
            assert_eq!(poll.duration_ms, 2000);
            poll.id
        }
        other => panic!("expected poll_created, got {other:?}"),
    };
    for student in [&mut alice, &mut bob, &mut carol] {
        match recv(student).await {
            ServerMessage::PollCreated { poll } => assert_eq!(poll.id, poll_id),
            other => panic!("expected poll_created, got {other:?}"),
        }
    }

    send(
        &mut alice,
        &ClientMessage::SubmitAnswer {
            option: "4".to_string(),
        },
    )
    .await;
    send(
        &mut bob,
        &ClientMessage::SubmitAnswer {
            option: "4".to_string(),
        },
    )
    .await;
    send(
        &mut carol,
        &ClientMessage::SubmitAnswer {
            option: "3".to_string(),
        },
    )
    .await;

    // The teacher converges on the full results, keyed by participant ID.
    let frame = recv_until(&mut teacher, |frame| {
        matches!(frame, ServerMessage::ResultsUpdated { results } if results.len() == 3)
    })
    .await;
    match frame {
        ServerMessage::ResultsUpdated { results } => {
            assert_eq!(results.get(&alice_id).map(String::as_str), Some("4"));
            assert_eq!(results.values().filter(|v| *v == "4").count(), 2);
            assert_eq!(results.values().filter(|v| *v == "3").count(), 1);
        }
        other => panic!("expected results_updated, got {other:?}"),
    }

    // The countdown expires and the poll ends with the final results.
    let frame = recv_until(&mut teacher, |frame| {
        matches!(frame, ServerMessage::PollEnded { .. })
    })
    .await;
    match frame {
        ServerMessage::PollEnded {
            poll_id: ended,
            results,
        } => {
            assert_eq!(ended, poll_id);
            assert_eq!(results.len(), 3);
        }
        other => panic!("expected poll_ended, got {other:?}"),
    }

    // The completed poll is in the history, newest first.
    send(&mut teacher, &ClientMessage::History).await;
    match recv_until(&mut teacher, |frame| {
        matches!(frame, ServerMessage::History { .. })
    })
    .await
    {
        ServerMessage::History { polls } => {
            assert_eq!(polls.len(), 1);
            assert_eq!(polls[0].poll.id, poll_id);
            assert_eq!(polls[0].results.len(), 3);
        }
        other => panic!("expected history, got {other:?}"),
    }
}

#[tokio::test]
async fn vote_errors_leave_connection_usable() {
    let addr = start_gateway(RoomConfig::default()).await;
    let mut teacher = connect(addr).await;
    let mut student = connect(addr).await;
    join(&mut teacher, "t", Role::Teacher).await;
    join(&mut student, "s", Role::Student).await;

    // Voting with no active poll is rejected, not fatal.
    send(
        &mut student,
        &ClientMessage::SubmitAnswer {
            option: "4".to_string(),
        },
    )
    .await;
    match recv(&mut student).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "vote_rejected"),
        other => panic!("expected error, got {other:?}"),
    }

    send(
        &mut teacher,
        &ClientMessage::CreatePoll {
            question: "Q?".to_string(),
            options: options(&[("A", true)]),
            duration_ms: 60_000,
        },
    )
    .await;
    recv_until(&mut student, |frame| {
        matches!(frame, ServerMessage::PollCreated { .. })
    })
    .await;

    // Wrong option text is rejected by exact comparison.
    send(
        &mut student,
        &ClientMessage::SubmitAnswer {
            option: "a".to_string(),
        },
    )
    .await;
    match recv(&mut student).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "vote_rejected"),
        other => panic!("expected error, got {other:?}"),
    }

    // The connection still works.
    send(
        &mut student,
        &ClientMessage::SubmitAnswer {
            option: "A".to_string(),
        },
    )
    .await;
    match recv(&mut student).await {
        ServerMessage::ResultsUpdated { results } => assert_eq!(results.len(), 1),
        other => panic!("expected results_updated, got {other:?}"),
    }

    // A second vote from the same participant is rejected and the results
    // stay as they were.
    send(
        &mut student,
        &ClientMessage::SubmitAnswer {
            option: "A".to_string(),
        },
    )
    .await;
    match recv(&mut student).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "vote_rejected"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn role_enforcement_over_the_wire() {
    let addr = start_gateway(RoomConfig::default()).await;

    let mut teacher = connect(addr).await;
    join(&mut teacher, "t", Role::Teacher).await;

    // A second teacher is turned away.
    let mut second = connect(addr).await;
    send(
        &mut second,
        &ClientMessage::JoinTeacher {
            name: "t2".to_string(),
        },
    )
    .await;
    match recv(&mut second).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "forbidden"),
        other => panic!("expected error, got {other:?}"),
    }

    // Students cannot create polls.
    let mut student = connect(addr).await;
    join(&mut student, "s", Role::Student).await;
    send(
        &mut student,
        &ClientMessage::CreatePoll {
            question: "Q?".to_string(),
            options: options(&[("A", false)]),
            duration_ms: 1000,
        },
    )
    .await;
    match recv(&mut student).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "forbidden"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_frames_get_invalid_request() {
    let addr = start_gateway(RoomConfig::default()).await;
    let mut ws = connect(addr).await;

    ws.send(Message::text("not json")).await.expect("send");
    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "invalid_request"),
        other => panic!("expected error, got {other:?}"),
    }

    // Commands before join are rejected but the socket stays open.
    send(&mut ws, &ClientMessage::History).await;
    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "invalid_request"),
        other => panic!("expected error, got {other:?}"),
    }

    join(&mut ws, "late", Role::Student).await;
}

#[tokio::test]
async fn late_joiner_catches_up_mid_poll() {
    let addr = start_gateway(RoomConfig::default()).await;
    let mut teacher = connect(addr).await;
    join(&mut teacher, "t", Role::Teacher).await;
    send(
        &mut teacher,
        &ClientMessage::CreatePoll {
            question: "Q?".to_string(),
            options: options(&[("A", false), ("B", false)]),
            duration_ms: 60_000,
        },
    )
    .await;
    recv_until(&mut teacher, |frame| {
        matches!(frame, ServerMessage::PollCreated { .. })
    })
    .await;

    let mut late = connect(addr).await;
    join(&mut late, "late", Role::Student).await;
    match recv(&mut late).await {
        ServerMessage::PollCreated { poll } => assert_eq!(poll.question, "Q?"),
        other => panic!("expected poll_created, got {other:?}"),
    }
    match recv(&mut late).await {
        ServerMessage::ResultsUpdated { results } => assert!(results.is_empty()),
        other => panic!("expected results_updated, got {other:?}"),
    }
    match recv(&mut late).await {
        ServerMessage::TimeTick { remaining_ms } => assert!(remaining_ms <= 60_000),
        other => panic!("expected time_tick, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_frees_the_teacher_slot() {
    let addr = start_gateway(RoomConfig::default()).await;

    let mut teacher = connect(addr).await;
    join(&mut teacher, "t", Role::Teacher).await;
    teacher.close(None).await.expect("close");

    // Registration is released when the connection goes away.
    let mut replacement = connect(addr).await;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        send(
            &mut replacement,
            &ClientMessage::JoinTeacher {
                name: "t2".to_string(),
            },
        )
        .await;
        match recv(&mut replacement).await {
            ServerMessage::Joined {
                role: Role::Teacher,
                ..
            } => break,
            ServerMessage::Error { .. } if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            other => panic!("teacher slot never freed: {other:?}"),
        }
    }
}
