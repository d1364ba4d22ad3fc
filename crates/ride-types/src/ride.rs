//! Ride rows.

use crate::error::{RowParseError, RowParseResult};
use crate::ids::{RideId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a ride.
///
/// Transitions are performed by server-side procedures; clients only observe
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Accepted,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    /// Wire representation, as stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Accepted => "accepted",
            RideStatus::Scheduled => "scheduled",
            RideStatus::InProgress => "in_progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true once the ride can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GPS position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Who cancelled a ride, when and why. All columns are nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_by: Option<UserId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl Cancellation {
    /// Returns true when no cancellation metadata is present.
    pub fn is_empty(&self) -> bool {
        self.cancelled_by.is_none() && self.cancelled_at.is_none() && self.reason.is_none()
    }
}

/// Column layout of the `rides` table.
#[derive(Debug, Deserialize)]
struct RideRow {
    id: RideId,
    status: RideStatus,
    #[serde(default)]
    current_latitude: Option<f64>,
    #[serde(default)]
    current_longitude: Option<f64>,
    #[serde(default)]
    cancelled_by: Option<UserId>,
    #[serde(default)]
    cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    cancellation_reason: Option<String>,
    #[serde(default)]
    driver_id: Option<UserId>,
    #[serde(default)]
    parent_id: Option<UserId>,
    #[serde(default)]
    scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Immutable point-in-time image of a ride row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideSnapshot {
    pub id: RideId,
    pub status: RideStatus,
    pub location: Option<Location>,
    pub cancellation: Cancellation,
    pub driver_id: Option<UserId>,
    pub parent_id: Option<UserId>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RideSnapshot {
    /// Parse a `rides` row object.
    ///
    /// Fails when the value is not an object or when `id`/`status` are
    /// missing, which is the case for identity-only old images.
    pub fn from_row(row: &serde_json::Value) -> RowParseResult<Self> {
        if !row.is_object() {
            return Err(RowParseError::NotAnObject(json_kind(row)));
        }
        let row = RideRow::deserialize(row).map_err(|source| RowParseError::Shape {
            entity: "ride",
            source,
        })?;

        let location = match (row.current_latitude, row.current_longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            status: row.status,
            location,
            cancellation: Cancellation {
                cancelled_by: row.cancelled_by,
                cancelled_at: row.cancelled_at,
                reason: row.cancellation_reason,
            },
            driver_id: row.driver_id,
            parent_id: row.parent_id,
            scheduled_at: row.scheduled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// Returns true when the two snapshots disagree on position.
    pub fn location_differs(&self, other: &RideSnapshot) -> bool {
        self.location != other.location
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
