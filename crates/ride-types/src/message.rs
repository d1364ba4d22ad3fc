//! Ride chat messages.

use crate::error::{RowParseError, RowParseResult};
use crate::ids::{MessageId, RideId, UserId};
use crate::ride::json_kind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message exchanged between the driver and the parent of a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideMessage {
    pub id: MessageId,
    pub ride_id: RideId,
    pub sender_id: UserId,
    #[serde(default)]
    pub recipient_id: Option<UserId>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RideMessage {
    /// Parse a `messages` row object.
    pub fn from_row(row: &serde_json::Value) -> RowParseResult<Self> {
        if !row.is_object() {
            return Err(RowParseError::NotAnObject(json_kind(row)));
        }
        RideMessage::deserialize(row).map_err(|source| RowParseError::Shape {
            entity: "message",
            source,
        })
    }

    /// Returns true when `user_id` wrote this message.
    pub fn is_from(&self, user_id: &UserId) -> bool {
        &self.sender_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_message() {
        let row = json!({
            "id": 17,
            "ride_id": "ride-1",
            "sender_id": "user-9",
            "recipient_id": "user-2",
            "content": "Running five minutes late",
            "created_at": "2024-05-01T08:00:00Z"
        });
        let msg = RideMessage::from_row(&row).unwrap();
        assert_eq!(msg.id.as_str(), "17");
        assert_eq!(msg.ride_id.as_str(), "ride-1");
        assert!(msg.is_from(&UserId::parse("user-9").unwrap()));
        assert!(!msg.is_from(&UserId::parse("user-2").unwrap()));
    }

    #[test]
    fn test_missing_sender_fails() {
        let row = json!({"id": "m1", "ride_id": "ride-1", "content": "hi"});
        assert!(RideMessage::from_row(&row).is_err());
    }
}
