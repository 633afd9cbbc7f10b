//! Router semantics tests
//!
//! Drive the event router directly over in-memory backing services,
//! draining each connection's outbound buffer in place of a socket.

use integration_tests::{drain_events, next_event, FailingMessageStore, RouterHarness};
use relay_core::{MessageId, MessageKind, PresenceStatus, RoomId, UserId};
use relay_gateway::protocol::{
    ClientEvent, RoomTarget, SendMessagePayload, StatusChangePayload, ServerEvent,
};
use std::sync::Arc;

const ROOM: RoomId = RoomId::new(100);
const ALICE: UserId = UserId::new(1);
const BOB: UserId = UserId::new(2);

fn join(room_id: RoomId) -> ClientEvent {
    ClientEvent::JoinChat(RoomTarget { room_id })
}

fn leave(room_id: RoomId) -> ClientEvent {
    ClientEvent::LeaveChat(RoomTarget { room_id })
}

fn message(room_id: RoomId, content: &str) -> ClientEvent {
    ClientEvent::SendMessage(SendMessagePayload {
        room_id,
        content: content.to_string(),
        kind: MessageKind::Text,
        media_url: None,
        reply_to: None,
    })
}

/// Harness with alice and bob as members of ROOM
fn two_member_harness() -> RouterHarness {
    let harness = RouterHarness::new();
    harness.backend.seed_user(ALICE, "alice");
    harness.backend.seed_user(BOB, "bob");
    harness.backend.seed_member(ROOM, ALICE);
    harness.backend.seed_member(ROOM, BOB);
    harness
}

#[tokio::test]
async fn connect_subscribes_existing_rooms_and_publishes_online() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;

    assert!(harness.router.rooms().is_subscribed(ALICE, ROOM));

    // The user's own connection sees the online broadcast too
    let events = drain_events(&mut alice_rx);
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::UserStatusChanged { user_id, status: PresenceStatus::Online, .. }
        if *user_id == ALICE
    )));

    // No join notifications for restored subscriptions
    assert!(!events
        .iter()
        .any(|e| matches!(e, ServerEvent::UserJoinedChat { .. })));

    drop(alice);
}

#[tokio::test]
async fn second_connection_does_not_rebroadcast_online() {
    let harness = two_member_harness();

    let (_a1, mut rx1) = harness.connect(ALICE, "alice").await;
    drain_events(&mut rx1);

    let (_a2, mut rx2) = harness.connect(ALICE, "alice").await;

    assert!(next_event(&mut rx1).is_none());
    assert!(next_event(&mut rx2).is_none());
}

#[tokio::test]
async fn last_disconnect_publishes_offline_and_persists_it() {
    let harness = two_member_harness();

    let (a1, mut rx1) = harness.connect(ALICE, "alice").await;
    let (a2, _rx2) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut rx1);
    drain_events(&mut bob_rx);

    // One of two connections closing changes nothing visible
    harness.router.handle_disconnect(&a2).await;
    assert!(next_event(&mut bob_rx).is_none());

    harness.router.handle_disconnect(&a1).await;
    let events = drain_events(&mut bob_rx);
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::UserStatusChanged { user_id, status: PresenceStatus::Offline, .. }
        if *user_id == ALICE
    )));

    let (status, _) = harness.backend.statuses.status_of(ALICE).unwrap();
    assert_eq!(status, PresenceStatus::Offline);
}

#[tokio::test]
async fn join_by_non_member_errors_without_mutation() {
    let harness = two_member_harness();
    let outsider = UserId::new(99);
    harness.backend.seed_user(outsider, "mallory");

    let (conn, mut rx) = harness.connect(outsider, "mallory").await;
    drain_events(&mut rx);

    harness.router.dispatch(&conn, join(ROOM)).await;

    let ServerEvent::Error(payload) = next_event(&mut rx).expect("error event") else {
        panic!("expected error event");
    };
    assert_eq!(payload.code, "not_room_member");
    assert!(!harness.router.rooms().is_subscribed(outsider, ROOM));
}

#[tokio::test]
async fn join_broadcasts_once_and_is_idempotent() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);

    // Membership granted after connect, so neither user was auto-subscribed
    let fresh_room = RoomId::new(300);
    harness.backend.seed_member(fresh_room, ALICE);
    harness.backend.seed_member(fresh_room, BOB);

    harness.router.dispatch(&bob, join(fresh_room)).await;
    drain_events(&mut bob_rx);

    harness.router.dispatch(&alice, join(fresh_room)).await;
    let events = drain_events(&mut bob_rx);
    assert_eq!(
        events,
        vec![ServerEvent::UserJoinedChat {
            room_id: fresh_room,
            user_id: ALICE
        }]
    );

    // The joining user gets no notification about themselves
    assert!(next_event(&mut alice_rx).is_none());

    // Re-joining is silent
    harness.router.dispatch(&alice, join(fresh_room)).await;
    assert!(next_event(&mut bob_rx).is_none());
}

#[tokio::test]
async fn leave_notifies_remaining_subscribers() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);

    harness.router.dispatch(&alice, leave(ROOM)).await;

    assert_eq!(
        drain_events(&mut bob_rx),
        vec![ServerEvent::UserLeftChat {
            room_id: ROOM,
            user_id: ALICE
        }]
    );
    assert!(next_event(&mut alice_rx).is_none());
    assert!(!harness.router.rooms().is_subscribed(ALICE, ROOM));
}

#[tokio::test]
async fn message_fans_out_to_subscribers_including_sender() {
    let harness = two_member_harness();
    let outsider = UserId::new(99);
    harness.backend.seed_user(outsider, "mallory");

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    let (_out, mut out_rx) = harness.connect(outsider, "mallory").await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);
    drain_events(&mut out_rx);

    harness.router.dispatch(&alice, message(ROOM, "hello")).await;

    for rx in [&mut alice_rx, &mut bob_rx] {
        let event = next_event(rx).expect("message event");
        let ServerEvent::MessageReceived(payload) = event else {
            panic!("expected message_received");
        };
        assert_eq!(payload.content, "hello");
        assert_eq!(payload.sender_id, ALICE);
        assert_eq!(payload.sender_name, "alice");
    }

    // Connected but not subscribed: nothing
    assert!(next_event(&mut out_rx).is_none());
    assert_eq!(harness.backend.messages.len(), 1);
}

#[tokio::test]
async fn edit_and_delete_notices_reach_only_room_subscribers() {
    let harness = two_member_harness();
    let outsider = UserId::new(99);
    harness.backend.seed_user(outsider, "mallory");

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    let (_out, mut out_rx) = harness.connect(outsider, "mallory").await;

    harness.router.dispatch(&alice, message(ROOM, "draft")).await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);
    drain_events(&mut out_rx);

    let stored = harness
        .backend
        .messages
        .get(MessageId::new(1))
        .expect("persisted message");
    let mut edited = stored.clone();
    edited.content = "revised".to_string();
    edited.edited = true;

    assert_eq!(harness.router.broadcast_message_updated(edited), 2);
    for rx in [&mut alice_rx, &mut bob_rx] {
        let ServerEvent::MessageUpdated(payload) = next_event(rx).expect("update event") else {
            panic!("expected message_updated");
        };
        assert_eq!(payload.id, stored.id);
        assert_eq!(payload.content, "revised");
        assert!(payload.edited);
    }
    assert!(next_event(&mut out_rx).is_none());

    assert_eq!(harness.router.broadcast_message_deleted(ROOM, stored.id), 2);
    for rx in [&mut alice_rx, &mut bob_rx] {
        assert_eq!(
            next_event(rx),
            Some(ServerEvent::MessageDeleted {
                room_id: ROOM,
                message_id: stored.id
            })
        );
    }
    assert!(next_event(&mut out_rx).is_none());
}

#[tokio::test]
async fn targeted_emits_cover_user_connections_and_everyone() {
    let harness = two_member_harness();

    let (_a1, mut rx1) = harness.connect(ALICE, "alice").await;
    let (_a2, mut rx2) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut rx1);
    drain_events(&mut rx2);
    drain_events(&mut bob_rx);

    let event = ServerEvent::MessageDeleted {
        room_id: ROOM,
        message_id: MessageId::new(7),
    };

    // Both of alice's connections, none of bob's
    assert_eq!(harness.router.emit_to_user(ALICE, &event), 2);
    assert_eq!(next_event(&mut rx1), Some(event.clone()));
    assert_eq!(next_event(&mut rx2), Some(event.clone()));
    assert!(next_event(&mut bob_rx).is_none());

    assert_eq!(harness.router.emit_to_all(&event), 3);
    for rx in [&mut rx1, &mut rx2, &mut bob_rx] {
        assert_eq!(next_event(rx), Some(event.clone()));
    }
}

#[tokio::test]
async fn empty_message_is_rejected_before_persistence() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    drain_events(&mut alice_rx);

    harness.router.dispatch(&alice, message(ROOM, "")).await;

    let ServerEvent::Error(payload) = next_event(&mut alice_rx).expect("error event") else {
        panic!("expected error event");
    };
    assert_eq!(payload.code, "validation_error");
    assert!(harness.backend.messages.is_empty());
}

#[tokio::test]
async fn persistence_failure_reports_to_sender_only() {
    let harness = RouterHarness::with_message_store(Arc::new(FailingMessageStore));
    harness.backend.seed_member(ROOM, ALICE);
    harness.backend.seed_member(ROOM, BOB);

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);

    harness.router.dispatch(&alice, message(ROOM, "hello")).await;

    let ServerEvent::Error(payload) = next_event(&mut alice_rx).expect("error event") else {
        panic!("expected error event");
    };
    assert_eq!(payload.code, "persistence_error");

    // No optimistic broadcast
    assert!(next_event(&mut bob_rx).is_none());
}

#[tokio::test]
async fn typing_start_reaches_other_subscribers_with_display_name() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);

    harness
        .router
        .dispatch(&alice, ClientEvent::TypingStart(RoomTarget { room_id: ROOM }))
        .await;

    assert_eq!(
        drain_events(&mut bob_rx),
        vec![ServerEvent::UserTyping {
            room_id: ROOM,
            user_id: ALICE,
            user_name: "alice".to_string()
        }]
    );
    assert!(next_event(&mut alice_rx).is_none());
}

#[tokio::test]
async fn typing_stop_is_idempotent() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);

    let start = ClientEvent::TypingStart(RoomTarget { room_id: ROOM });
    let stop = ClientEvent::TypingStop(RoomTarget { room_id: ROOM });

    harness.router.dispatch(&alice, start).await;
    harness.router.dispatch(&alice, stop.clone()).await;

    let events = drain_events(&mut bob_rx);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], ServerEvent::UserStoppedTyping { .. }));

    // A second stop produces nothing
    harness.router.dispatch(&alice, stop).await;
    assert!(next_event(&mut bob_rx).is_none());
}

#[tokio::test(start_paused = true)]
async fn typing_expires_exactly_once() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);

    harness
        .router
        .dispatch(&alice, ClientEvent::TypingStart(RoomTarget { room_id: ROOM }))
        .await;
    drain_events(&mut bob_rx);

    // Before the TTL, a sweep removes nothing
    tokio::time::advance(std::time::Duration::from_secs(4)).await;
    assert_eq!(harness.router.sweep_typing(), 0);
    assert!(next_event(&mut bob_rx).is_none());

    tokio::time::advance(std::time::Duration::from_secs(2)).await;
    assert_eq!(harness.router.sweep_typing(), 1);
    assert_eq!(
        drain_events(&mut bob_rx),
        vec![ServerEvent::UserStoppedTyping {
            room_id: ROOM,
            user_id: ALICE
        }]
    );

    // The entry is gone; nothing expires twice
    assert_eq!(harness.router.sweep_typing(), 0);
    assert!(next_event(&mut bob_rx).is_none());
}

#[tokio::test]
async fn disconnect_unwinds_typing_and_rooms() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);

    harness
        .router
        .dispatch(&alice, ClientEvent::TypingStart(RoomTarget { room_id: ROOM }))
        .await;
    drain_events(&mut bob_rx);

    harness.router.handle_disconnect(&alice).await;

    let events = drain_events(&mut bob_rx);
    assert!(events.contains(&ServerEvent::UserStoppedTyping {
        room_id: ROOM,
        user_id: ALICE
    }));
    assert!(events.contains(&ServerEvent::UserLeftChat {
        room_id: ROOM,
        user_id: ALICE
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::UserStatusChanged { user_id, status: PresenceStatus::Offline, .. }
        if *user_id == ALICE
    )));
}

#[tokio::test]
async fn explicit_status_change_broadcasts_to_everyone() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    let (_bob, mut bob_rx) = harness.connect(BOB, "bob").await;
    drain_events(&mut alice_rx);
    drain_events(&mut bob_rx);

    harness
        .router
        .dispatch(
            &alice,
            ClientEvent::UserStatusChange(StatusChangePayload {
                status: PresenceStatus::Away,
            }),
        )
        .await;

    for rx in [&mut alice_rx, &mut bob_rx] {
        let events = drain_events(rx);
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::UserStatusChanged { user_id, status: PresenceStatus::Away, .. }
            if *user_id == ALICE
        )));
    }

    let (status, _) = harness.backend.statuses.status_of(ALICE).unwrap();
    assert_eq!(status, PresenceStatus::Away);
}

#[tokio::test]
async fn repeated_status_change_is_silent() {
    let harness = two_member_harness();

    let (alice, mut alice_rx) = harness.connect(ALICE, "alice").await;
    drain_events(&mut alice_rx);

    let away = ClientEvent::UserStatusChange(StatusChangePayload {
        status: PresenceStatus::Away,
    });
    harness.router.dispatch(&alice, away.clone()).await;
    drain_events(&mut alice_rx);

    harness.router.dispatch(&alice, away).await;
    assert!(next_event(&mut alice_rx).is_none());
}
