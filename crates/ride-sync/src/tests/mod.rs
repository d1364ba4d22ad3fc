//! Tests for the ride sync session.
//!
//! - `harness.rs`     - Mock channel provider, recording sink, session wiring
//! - `lifecycle.rs`   - Open, acknowledgment, failures, close
//! - `ride_events.rs` - Status alerts, refresh requests, location ticks
//! - `messages.rs`    - Message alerts and own-echo suppression
//! - `isolation.rs`   - Stale generations never mutate the active session

pub(crate) mod harness;
mod messages;
