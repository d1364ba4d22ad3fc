//! Ride domain types shared by the sync session and the ride store client.
//!
//! Rows arrive from the backend as untyped JSON objects. This crate is the
//! boundary where they become `RideSnapshot` and `RideMessage` values; nothing
//! downstream inspects raw JSON.

mod error;
mod ids;
mod message;
mod ride;

pub use error::{RowParseError, RowParseResult};
pub use ids::{MessageId, RideId, UserId};
pub use message::RideMessage;
pub use ride::{Cancellation, Location, RideSnapshot, RideStatus};
