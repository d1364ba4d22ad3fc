//! Message inserts: alerts for the other party, silence for own echoes.

use super::harness::{message_row, settle, TestSession};
use crate::notification::{NotificationKind, NEW_MESSAGE_TITLE};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn own_message_is_suppressed() {
    let t = TestSession::new();
    t.open_connected("ride-1", "user-9").await;

    t.provider.message_insert(message_row("user-9"));
    settle().await;

    assert_eq!(t.sink.count(), 0);
    assert!(t.session.last_update().is_none());
}

#[tokio::test(start_paused = true)]
async fn message_from_other_party_notifies() {
    let t = TestSession::new();
    t.open_connected("ride-1", "user-9").await;

    t.provider.message_insert(message_row("driver-7"));
    settle().await;

    let notifications = t.sink.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, NEW_MESSAGE_TITLE);
    assert_eq!(notifications[0].kind, NotificationKind::Message);
    assert!(t.session.last_update().is_some());
    assert_eq!(t.session.refresh_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn each_message_notifies_once() {
    let t = TestSession::new();
    t.open_connected("ride-1", "user-9").await;

    for sender in ["driver-7", "user-9", "driver-7", "user-9", "dispatcher-1"] {
        t.provider.message_insert(message_row(sender));
    }
    settle().await;

    assert_eq!(t.sink.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn malformed_message_is_discarded() {
    let t = TestSession::new();
    t.open_connected("ride-1", "user-9").await;

    t.provider
        .message_insert(json!({"id": 5, "ride_id": "ride-1", "content": "no sender"}));
    t.provider.message_insert(json!({"id": 6, "ride_id": "ride-1", "sender_id": ""}));
    settle().await;

    assert_eq!(t.sink.count(), 0);
    assert!(t.session.last_update().is_none());
}

#[tokio::test(start_paused = true)]
async fn messages_flow_before_ride_ack() {
    let t = TestSession::new();
    t.open("ride-1", "user-9");

    t.provider.message_insert(message_row("driver-7"));
    settle().await;

    assert_eq!(t.sink.count(), 1);
}
