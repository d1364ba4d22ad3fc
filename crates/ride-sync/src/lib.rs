//! Client-side ride lifecycle synchronization.
//!
//! This crate provides:
//! - `RideSyncSession`: live ride and message subscriptions for one consumer
//! - An explicit connection status state machine
//! - The notification sink contract and a capped toast queue
//!
//! The session never fetches data itself. It raises a refresh request and the
//! consumer re-pulls the ride from the store.

mod config;
mod error;
pub mod fsm;
pub mod interpret;
mod notification;
mod session;
mod toast;

#[cfg(test)]
mod tests;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use fsm::ConnectionStatus;
pub use notification::{
    Notification, NotificationKind, NotificationSink, NEW_MESSAGE_TITLE, STATUS_CHANGED_TITLE,
};
pub use session::{RideSyncSession, SessionGeneration, SyncState};
pub use toast::{Toast, ToastConfig, ToastEvent, ToastId, ToastQueue};
