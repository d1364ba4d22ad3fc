//! Turning row changes into session effects.
//!
//! Pure functions: the session decides what to do with the result under its
//! own lock.

use crate::error::SyncResult;
use ride_types::{RideMessage, RideSnapshot, RideStatus, UserId};

/// What an `UPDATE` on the ride row asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RideEffects {
    /// Set when the status moved; carries the new status for the alert.
    pub notify_status: Option<RideStatus>,
    /// Ask the consumer to re-pull the ride.
    pub request_refresh: bool,
    /// Bump the last update timestamp.
    pub touch_last_update: bool,
}

impl RideEffects {
    /// Returns true when the event changes nothing observable.
    pub fn is_noop(&self) -> bool {
        self.notify_status.is_none() && !self.request_refresh && !self.touch_last_update
    }
}

/// Diff the old and new ride images.
///
/// Status and location are checked independently. Default replica identity
/// ships an old image holding only the key; then the diff runs against
/// `last_known`, the latest image this session already saw for the ride.
/// With no usable baseline the status comparison is unknowable: the consumer
/// is asked to refresh, nobody is alerted, and the timestamp moves.
///
/// Returns the parsed new image alongside the effects so the caller can keep
/// it as the next baseline.
pub fn ride_effects(
    old: &serde_json::Value,
    new: &serde_json::Value,
    last_known: Option<&RideSnapshot>,
) -> SyncResult<(RideSnapshot, RideEffects)> {
    let new = RideSnapshot::from_row(new)?;

    let parsed_old = RideSnapshot::from_row(old).ok();
    let baseline = parsed_old
        .as_ref()
        .or(last_known.filter(|previous| previous.id == new.id));

    let effects = match baseline {
        Some(baseline) => diff(baseline, &new),
        None => RideEffects {
            notify_status: None,
            request_refresh: true,
            touch_last_update: true,
        },
    };
    Ok((new, effects))
}

fn diff(old: &RideSnapshot, new: &RideSnapshot) -> RideEffects {
    let status_changed = old.status != new.status;
    RideEffects {
        notify_status: status_changed.then_some(new.status),
        request_refresh: status_changed,
        touch_last_update: old.location_differs(new),
    }
}

/// Parse an inserted message. `None` when the consumer wrote it.
pub fn incoming_message(
    row: &serde_json::Value,
    user_id: &UserId,
) -> SyncResult<Option<RideMessage>> {
    let message = RideMessage::from_row(row)?;
    if message.is_from(user_id) {
        return Ok(None);
    }
    Ok(Some(message))
}
