//! Phoenix channel frames spoken by Supabase Realtime.

use crate::provider::{ChangeKind, ChannelSpec, RowChange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Join a channel.
pub const EVENT_JOIN: &str = "phx_join";
/// Leave a channel.
pub const EVENT_LEAVE: &str = "phx_leave";
/// Server reply to a pushed frame.
pub const EVENT_REPLY: &str = "phx_reply";
/// Channel crashed server-side.
pub const EVENT_ERROR: &str = "phx_error";
/// Channel closed server-side.
pub const EVENT_CLOSE: &str = "phx_close";
/// Socket keepalive.
pub const EVENT_HEARTBEAT: &str = "heartbeat";
/// Table change notification.
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";
/// Realtime extension status.
pub const EVENT_SYSTEM: &str = "system";
/// Topic used for socket-level frames.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// A frame sent to or received from the realtime socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhoenixMessage {
    /// Create a `phx_join` frame for a postgres_changes channel.
    pub fn join(spec: &ChannelSpec, join_ref: &str, access_token: Option<&str>) -> Self {
        let mut payload = serde_json::json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [{
                    "event": spec.event.as_str(),
                    "schema": spec.schema,
                    "table": spec.table,
                    "filter": spec.filter.to_string()
                }],
                "private": false
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = serde_json::json!(token);
        }

        Self {
            topic: spec.topic(),
            event: EVENT_JOIN.to_string(),
            payload,
            msg_ref: Some(join_ref.to_string()),
            join_ref: Some(join_ref.to_string()),
        }
    }

    /// Create a `phx_leave` frame.
    pub fn leave(topic: &str, msg_ref: &str, join_ref: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_LEAVE.to_string(),
            payload: serde_json::json!({}),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: Some(join_ref.to_string()),
        }
    }

    /// Create a socket heartbeat frame.
    pub fn heartbeat(msg_ref: &str) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: serde_json::json!({}),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: None,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Payload of a `phx_reply` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyPayload {
    pub status: String,
    #[serde(default)]
    pub response: serde_json::Value,
}

impl ReplyPayload {
    /// Returns true when the server accepted the pushed frame.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Best-effort human-readable reason for an error reply.
    pub fn reason(&self) -> Option<String> {
        match &self.response {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => other
                .get("reason")
                .and_then(|r| r.as_str())
                .map(|s| s.to_string())
                .or_else(|| Some(other.to_string())),
        }
    }
}

/// Payload of a `system` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

impl SystemPayload {
    /// Returns true when the extension reported a failure.
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

/// Payload of a `postgres_changes` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresChangesPayload {
    pub data: PostgresChangeData,
}

/// Row change body inside a `postgres_changes` frame.
///
/// The server sends `type`, `record` and `old_record`; the client-library
/// names `eventType`, `new` and `old` are accepted as aliases. `columns` and
/// other extra keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresChangeData {
    pub schema: String,
    pub table: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub commit_timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "type", alias = "eventType")]
    pub event_type: String,
    #[serde(default, rename = "record", alias = "new")]
    pub new: serde_json::Value,
    #[serde(default, rename = "old_record", alias = "old")]
    pub old: serde_json::Value,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

/// An unparseable commit timestamp must not cost the row change.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
    }))
}

impl PostgresChangeData {
    /// Convert into a [`RowChange`], or `None` for change kinds channels never
    /// subscribe to (e.g. `DELETE`).
    pub fn into_row_change(self) -> Option<RowChange> {
        let kind = match self.event_type.as_str() {
            "INSERT" => ChangeKind::Insert,
            "UPDATE" => ChangeKind::Update,
            _ => return None,
        };
        Some(RowChange {
            kind,
            schema: self.schema,
            table: self.table,
            commit_timestamp: self.commit_timestamp,
            old: self.old,
            new: self.new,
        })
    }
}
