//! Notification sink contract.

use ride_types::{RideId, RideStatus};
use serde::Serialize;

/// Title used for status change alerts.
pub const STATUS_CHANGED_TITLE: &str = "Ride Status Updated";
/// Title used for incoming message alerts.
pub const NEW_MESSAGE_TITLE: &str = "New Message";

/// What caused a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RideStatus,
    Message,
}

/// A user-facing alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub ride_id: RideId,
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Alert for a ride that moved to `status`.
    pub fn status_changed(ride_id: RideId, status: RideStatus) -> Self {
        Self {
            kind: NotificationKind::RideStatus,
            ride_id,
            title: STATUS_CHANGED_TITLE.to_string(),
            body: format!("Ride status changed to {}", status),
        }
    }

    /// Alert for a message from the other party.
    pub fn new_message(ride_id: RideId) -> Self {
        Self {
            kind: NotificationKind::Message,
            ride_id,
            title: NEW_MESSAGE_TITLE.to_string(),
            body: "You have a new message".to_string(),
        }
    }
}

/// Receives alerts from the session. Fire-and-forget: implementations must
/// not block and cannot report failure back.
///
/// `notify` runs under the session lock, so it must not call back into the
/// session.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}
