//! Supabase Realtime channels for ride sync.
//!
//! This crate provides:
//! - The `ChannelProvider` contract the sync session is written against
//! - Phoenix channel frames for `postgres_changes` subscriptions
//! - A websocket client with heartbeat and join timeouts

mod client;
mod config;
mod error;
pub mod protocol;
mod provider;

pub use client::RealtimeClient;
pub use config::RealtimeConfig;
pub use error::{RealtimeError, RealtimeResult};
pub use provider::{
    ChangeKind, ChannelEvent, ChannelHandle, ChannelProvider, ChannelSpec, LifecycleSignal,
    RowChange, RowFilter, Subscription,
};
