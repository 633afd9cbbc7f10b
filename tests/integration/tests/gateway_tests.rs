//! Gateway end-to-end tests
//!
//! Spin up a real gateway on an ephemeral port and drive it with
//! WebSocket clients. Presence broadcasts interleave with the events
//! under test, so assertions scan for the expected event.

use anyhow::Result;
use futures_util::SinkExt;
use integration_tests::{recv_event, send_json, TestBackend, TestServer, WsClient};
use relay_core::{PresenceStatus, RoomId, UserId};
use relay_gateway::protocol::ServerEvent;
use serde_json::json;

const ROOM: RoomId = RoomId::new(1);
const ALICE: UserId = UserId::new(10);
const BOB: UserId = UserId::new(20);

fn seeded_backend() -> TestBackend {
    let backend = TestBackend::new();
    backend.seed_user(ALICE, "alice");
    backend.seed_user(BOB, "bob");
    backend.seed_member(ROOM, ALICE);
    backend.seed_member(ROOM, BOB);
    backend
}

/// Read events until one matches, failing on timeout
async fn next_matching<F>(ws: &mut WsClient, mut matches: F) -> Result<ServerEvent>
where
    F: FnMut(&ServerEvent) -> bool,
{
    loop {
        let event = recv_event(ws).await?;
        if matches(&event) {
            return Ok(event);
        }
    }
}

#[tokio::test]
async fn handshake_without_credential_is_rejected() -> Result<()> {
    let backend = seeded_backend();
    let server = TestServer::start(backend.collaborators()).await?;

    // Missing token entirely
    match tokio_tungstenite::connect_async(format!("ws://{}/gateway", server.addr)).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected 401 rejection, got {other:?}"),
    }

    // Garbage token
    server.connect_expect_rejected("garbage").await?;

    Ok(())
}

#[tokio::test]
async fn expired_credential_is_rejected() -> Result<()> {
    let backend = seeded_backend();
    let server = TestServer::start(backend.collaborators()).await?;

    let expired = relay_common::JwtService::new(integration_tests::TEST_JWT_SECRET, -120)
        .issue_access_token(ALICE, "alice", None)?;
    server.connect_expect_rejected(&expired).await?;

    Ok(())
}

#[tokio::test]
async fn message_reaches_both_subscribers_over_the_socket() -> Result<()> {
    let backend = seeded_backend();
    let alice_token = backend.token_for(ALICE, "alice");
    let bob_token = backend.token_for(BOB, "bob");
    let server = TestServer::start(backend.collaborators()).await?;

    let mut alice = server.connect(&alice_token).await?;
    let mut bob = server.connect(&bob_token).await?;

    // Both users are online before the message goes out
    next_matching(&mut alice, |e| {
        matches!(e, ServerEvent::UserStatusChanged { user_id, .. } if *user_id == BOB)
    })
    .await?;

    send_json(
        &mut alice,
        &json!({
            "event": "send_message",
            "data": { "room_id": "1", "content": "hello over the wire" }
        }),
    )
    .await?;

    for ws in [&mut alice, &mut bob] {
        let event =
            next_matching(ws, |e| matches!(e, ServerEvent::MessageReceived(_))).await?;
        let ServerEvent::MessageReceived(payload) = event else {
            unreachable!();
        };
        assert_eq!(payload.content, "hello over the wire");
        assert_eq!(payload.sender_id, ALICE);
        assert_eq!(payload.room_id, ROOM);
    }

    Ok(())
}

#[tokio::test]
async fn typing_indicator_reaches_the_other_subscriber() -> Result<()> {
    let backend = seeded_backend();
    let alice_token = backend.token_for(ALICE, "alice");
    let bob_token = backend.token_for(BOB, "bob");
    let server = TestServer::start(backend.collaborators()).await?;

    let mut alice = server.connect(&alice_token).await?;
    let mut bob = server.connect(&bob_token).await?;

    // Bob is registered and subscribed once his online broadcast arrives
    next_matching(&mut alice, |e| {
        matches!(e, ServerEvent::UserStatusChanged { user_id, .. } if *user_id == BOB)
    })
    .await?;

    send_json(
        &mut alice,
        &json!({ "event": "typing_start", "data": { "room_id": "1" } }),
    )
    .await?;

    let event = next_matching(&mut bob, |e| matches!(e, ServerEvent::UserTyping { .. })).await?;
    assert_eq!(
        event,
        ServerEvent::UserTyping {
            room_id: ROOM,
            user_id: ALICE,
            user_name: "alice".to_string()
        }
    );

    send_json(
        &mut alice,
        &json!({ "event": "typing_stop", "data": { "room_id": "1" } }),
    )
    .await?;

    let event = next_matching(&mut bob, |e| {
        matches!(e, ServerEvent::UserStoppedTyping { .. })
    })
    .await?;
    assert_eq!(
        event,
        ServerEvent::UserStoppedTyping {
            room_id: ROOM,
            user_id: ALICE
        }
    );

    Ok(())
}

#[tokio::test]
async fn status_change_is_broadcast_to_other_connections() -> Result<()> {
    let backend = seeded_backend();
    let alice_token = backend.token_for(ALICE, "alice");
    let bob_token = backend.token_for(BOB, "bob");
    let server = TestServer::start(backend.collaborators()).await?;

    let mut alice = server.connect(&alice_token).await?;
    let mut bob = server.connect(&bob_token).await?;

    next_matching(&mut alice, |e| {
        matches!(e, ServerEvent::UserStatusChanged { user_id, .. } if *user_id == BOB)
    })
    .await?;

    send_json(
        &mut alice,
        &json!({ "event": "user_status_change", "data": { "status": "away" } }),
    )
    .await?;

    let event = next_matching(&mut bob, |e| {
        matches!(
            e,
            ServerEvent::UserStatusChanged { user_id, status: PresenceStatus::Away, .. }
            if *user_id == ALICE
        )
    })
    .await?;
    assert_eq!(event.name(), "user_status_changed");

    Ok(())
}

#[tokio::test]
async fn malformed_frame_gets_a_validation_error() -> Result<()> {
    let backend = seeded_backend();
    let alice_token = backend.token_for(ALICE, "alice");
    let server = TestServer::start(backend.collaborators()).await?;

    let mut alice = server.connect(&alice_token).await?;

    alice
        .send(tokio_tungstenite::tungstenite::Message::Text(
            "not json".to_string(),
        ))
        .await?;

    let event = next_matching(&mut alice, |e| matches!(e, ServerEvent::Error(_))).await?;
    let ServerEvent::Error(payload) = event else {
        unreachable!();
    };
    assert_eq!(payload.code, "validation_error");

    Ok(())
}

#[tokio::test]
async fn non_member_send_is_rejected_over_the_socket() -> Result<()> {
    let backend = seeded_backend();
    let outsider = UserId::new(99);
    backend.seed_user(outsider, "mallory");
    let token = backend.token_for(outsider, "mallory");
    let server = TestServer::start(backend.collaborators()).await?;

    let mut ws = server.connect(&token).await?;

    send_json(
        &mut ws,
        &json!({
            "event": "send_message",
            "data": { "room_id": "1", "content": "let me in" }
        }),
    )
    .await?;

    let event = next_matching(&mut ws, |e| matches!(e, ServerEvent::Error(_))).await?;
    let ServerEvent::Error(payload) = event else {
        unreachable!();
    };
    assert_eq!(payload.code, "not_room_member");

    Ok(())
}
