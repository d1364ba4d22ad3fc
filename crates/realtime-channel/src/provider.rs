//! Channel provider contract.
//!
//! A provider hands out filtered table-change subscriptions. Subscribing never
//! blocks: the acknowledgment arrives later as a [`LifecycleSignal`] on the
//! subscription's event receiver, interleaved with row changes in provider
//! order.

use crate::error::RealtimeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Kind of row change a channel listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Insert,
    Update,
}

impl ChangeKind {
    /// Wire name used in `postgres_changes` configs and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
        }
    }
}

/// Row predicate applied server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    /// `column = value`
    Eq { column: String, value: String },
}

impl RowFilter {
    /// Build an equality filter.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        RowFilter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowFilter::Eq { column, value } => write!(f, "{}=eq.{}", column, value),
        }
    }
}

/// What to subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Channel name, unique per live subscription.
    pub name: String,
    /// Row change kind to deliver.
    pub event: ChangeKind,
    /// Database schema (usually `public`).
    pub schema: String,
    /// Table name.
    pub table: String,
    /// Row predicate.
    pub filter: RowFilter,
}

impl ChannelSpec {
    /// Phoenix topic for this channel.
    pub fn topic(&self) -> String {
        format!("realtime:{}", self.name)
    }
}

/// Opaque handle used to release a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    topic: String,
    id: u64,
}

impl ChannelHandle {
    /// Create a handle. Providers call this when registering a channel.
    pub fn new(topic: impl Into<String>, id: u64) -> Self {
        Self {
            topic: topic.into(),
            id,
        }
    }

    /// Topic the handle refers to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Provider-assigned id, distinct for every subscribe call.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.topic, self.id)
    }
}

/// Subscription lifecycle reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// The server confirmed the subscription.
    Subscribed,
    /// The server or transport rejected or dropped the channel.
    ChannelError(Option<String>),
    /// No confirmation arrived in time.
    TimedOut,
}

/// A row change delivered on a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    pub commit_timestamp: Option<DateTime<Utc>>,
    /// Old row image. `Null` or identity-only unless the table has full
    /// replica identity.
    pub old: serde_json::Value,
    /// New row image.
    pub new: serde_json::Value,
}

/// Anything a channel can deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Lifecycle(LifecycleSignal),
    Change(RowChange),
}

/// A live subscription: its handle and its ordered event stream.
#[derive(Debug)]
pub struct Subscription {
    pub handle: ChannelHandle,
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// Subscribe/unsubscribe primitives over named, filtered channels.
pub trait ChannelProvider: Send + Sync {
    /// Register a channel and request the server-side subscription.
    ///
    /// Returns immediately; confirmation arrives on `Subscription::events`.
    fn subscribe(&self, spec: ChannelSpec) -> RealtimeResult<Subscription>;

    /// Release a channel. Best-effort: the request may still be in flight
    /// when this returns.
    fn unsubscribe(&self, handle: &ChannelHandle) -> RealtimeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_string() {
        let filter = RowFilter::eq("ride_id", "ride-1");
        assert_eq!(filter.to_string(), "ride_id=eq.ride-1");
    }

    #[test]
    fn test_channel_topic() {
        let spec = ChannelSpec {
            name: "ride-ride-1-g3".to_string(),
            event: ChangeKind::Update,
            schema: "public".to_string(),
            table: "rides".to_string(),
            filter: RowFilter::eq("id", "ride-1"),
        };
        assert_eq!(spec.topic(), "realtime:ride-ride-1-g3");
    }

    #[test]
    fn test_change_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Insert).unwrap(),
            "\"INSERT\""
        );
        let kind: ChangeKind = serde_json::from_str("\"UPDATE\"").unwrap();
        assert_eq!(kind, ChangeKind::Update);
        assert_eq!(kind.as_str(), "UPDATE");
    }

    #[test]
    fn test_handle_display() {
        let handle = ChannelHandle::new("realtime:x", 4);
        assert_eq!(handle.to_string(), "realtime:x#4");
        assert_eq!(handle.topic(), "realtime:x");
        assert_eq!(handle.id(), 4);
    }
}
