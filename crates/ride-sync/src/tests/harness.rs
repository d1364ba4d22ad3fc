//! Test harness for ride sync session tests.
//!
//! Provides:
//! - MockChannelProvider: records subscribe/unsubscribe calls and lets tests
//!   push lifecycle signals and row changes into any channel, live or not
//! - RecordingSink: collects notifications
//! - TestSession: wires both to a `RideSyncSession`

use crate::notification::{Notification, NotificationSink};
use crate::session::RideSyncSession;
use crate::SyncConfig;
use chrono::{DateTime, Utc};
use realtime_channel::{
    ChangeKind, ChannelEvent, ChannelHandle, ChannelProvider, ChannelSpec, LifecycleSignal,
    RealtimeError, RealtimeResult, RowChange, Subscription,
};
use ride_types::{RideId, UserId};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// A channel the mock handed out.
#[derive(Clone)]
pub struct MockChannel {
    pub spec: ChannelSpec,
    pub handle: ChannelHandle,
    pub sender: mpsc::UnboundedSender<ChannelEvent>,
}

/// Channel provider that never touches the network.
#[derive(Default)]
pub struct MockChannelProvider {
    channels: Mutex<Vec<MockChannel>>,
    unsubscribed: Mutex<Vec<ChannelHandle>>,
    fail_subscribe_table: Mutex<Option<String>>,
    fail_unsubscribe: AtomicBool,
}

impl MockChannelProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subscribe to `table` fail.
    pub fn fail_subscribe_for(&self, table: &str) {
        *self.fail_subscribe_table.lock().unwrap() = Some(table.to_string());
    }

    /// Make every unsubscribe fail.
    pub fn fail_unsubscribe(&self, fail: bool) {
        self.fail_unsubscribe.store(fail, Ordering::SeqCst);
    }

    /// All channels handed out, oldest first.
    pub fn channels(&self) -> Vec<MockChannel> {
        self.channels.lock().unwrap().clone()
    }

    /// Most recent channel on `table`.
    pub fn latest(&self, table: &str) -> MockChannel {
        self.channels
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.spec.table == table)
            .cloned()
            .unwrap_or_else(|| panic!("no channel subscribed on {}", table))
    }

    pub fn unsubscribed(&self) -> Vec<ChannelHandle> {
        self.unsubscribed.lock().unwrap().clone()
    }

    /// Push an event into the latest channel on `table`.
    pub fn emit(&self, table: &str, event: ChannelEvent) {
        // Receiver may already be gone; late events are the point of some tests.
        let _ = self.latest(table).sender.send(event);
    }

    pub fn signal_ride(&self, signal: LifecycleSignal) {
        self.emit("rides", ChannelEvent::Lifecycle(signal));
    }

    pub fn ride_update(&self, old: Value, new: Value) {
        self.emit("rides", ride_update_event(old, new));
    }

    pub fn message_insert(&self, row: Value) {
        self.emit("messages", message_insert_event(row));
    }
}

impl ChannelProvider for MockChannelProvider {
    fn subscribe(&self, spec: ChannelSpec) -> RealtimeResult<Subscription> {
        if self.fail_subscribe_table.lock().unwrap().as_deref() == Some(spec.table.as_str()) {
            return Err(RealtimeError::NotConnected);
        }

        let mut channels = self.channels.lock().unwrap();
        let handle = ChannelHandle::new(spec.topic(), channels.len() as u64 + 1);
        let (sender, events) = mpsc::unbounded_channel();
        channels.push(MockChannel {
            spec,
            handle: handle.clone(),
            sender,
        });
        Ok(Subscription { handle, events })
    }

    fn unsubscribe(&self, handle: &ChannelHandle) -> RealtimeResult<()> {
        self.unsubscribed.lock().unwrap().push(handle.clone());
        if self.fail_unsubscribe.load(Ordering::SeqCst) {
            return Err(RealtimeError::Send("socket gone".to_string()));
        }
        Ok(())
    }
}

/// Sink that remembers every notification.
#[derive(Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// A session wired to the mocks.
pub struct TestSession {
    pub session: RideSyncSession,
    pub provider: Arc<MockChannelProvider>,
    pub sink: Arc<RecordingSink>,
}

impl TestSession {
    pub fn new() -> Self {
        let provider = MockChannelProvider::new();
        let sink = RecordingSink::new();
        let session = RideSyncSession::new(
            provider.clone(),
            sink.clone(),
            SyncConfig::default(),
            tokio::runtime::Handle::current(),
        );
        Self {
            session,
            provider,
            sink,
        }
    }

    /// Open for `ride_id` as `user_id`.
    pub fn open(&self, ride_id: &str, user_id: &str) {
        self.session
            .open(RideId::parse(ride_id), UserId::parse(user_id))
            .expect("session should open");
    }

    /// Open and confirm the ride channel.
    pub async fn open_connected(&self, ride_id: &str, user_id: &str) {
        self.open(ride_id, user_id);
        self.provider.signal_ride(LifecycleSignal::Subscribed);
        settle().await;
    }
}

/// Let every pump drain its queue. Tests run with a paused clock, which only
/// advances once all tasks are idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn ride_row(status: &str, lat: f64, lng: f64) -> Value {
    json!({
        "id": "ride-1",
        "status": status,
        "current_latitude": lat,
        "current_longitude": lng
    })
}

pub fn message_row(sender_id: &str) -> Value {
    json!({
        "id": 1,
        "ride_id": "ride-1",
        "sender_id": sender_id,
        "recipient_id": "someone-else",
        "content": "On my way"
    })
}

pub fn ride_update_event(old: Value, new: Value) -> ChannelEvent {
    ChannelEvent::Change(RowChange {
        kind: ChangeKind::Update,
        schema: "public".to_string(),
        table: "rides".to_string(),
        commit_timestamp: None,
        old,
        new,
    })
}

pub fn message_insert_event(row: Value) -> ChannelEvent {
    ChannelEvent::Change(RowChange {
        kind: ChangeKind::Insert,
        schema: "public".to_string(),
        table: "messages".to_string(),
        commit_timestamp: None,
        old: Value::Null,
        new: row,
    })
}

/// Returns true when `later` is not before `earlier`.
pub fn not_before(earlier: Option<DateTime<Utc>>, later: Option<DateTime<Utc>>) -> bool {
    match (earlier, later) {
        (Some(a), Some(b)) => b >= a,
        (None, _) => true,
        (Some(_), None) => false,
    }
}
