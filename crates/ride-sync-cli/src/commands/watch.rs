//! Follow a ride live.
//!
//! The session never retries on its own. This command is the consumer that
//! decides to: when the session drops to `disconnected` or the socket closes,
//! it reconnects with capped exponential backoff. Watching ends once a pulled
//! ride is completed or cancelled.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use chrono::Utc;
use realtime_channel::{ChannelProvider, RealtimeClient};
use ride_store::RideStoreClient;
use ride_sync::{
    ConnectionStatus, NotificationSink, RideSyncSession, SyncState, ToastEvent, ToastQueue,
};
use ride_types::{RideId, RideSnapshot, UserId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often dismissed toasts are purged.
const TOAST_PURGE_INTERVAL: Duration = Duration::from_secs(1);

/// Reconnect limits for the watch loop.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Give up after this many consecutive failed attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for any delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl ReconnectPolicy {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay_ms = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }

    /// Returns true once `attempt` failures have used up the budget.
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// Why one connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    Interrupted,
    /// The ride reached a final status.
    Finished,
    Dropped,
}

/// Watch a ride until it finishes, Ctrl-C, or the reconnect budget runs out.
pub async fn watch(
    ctx: &Context,
    ride_id: RideId,
    user_id: UserId,
    policy: ReconnectPolicy,
) -> Result<()> {
    let store = ctx.store()?;
    let toasts = Arc::new(ToastQueue::new(ctx.toast_config()));

    let interrupt = CancellationToken::new();
    let on_signal = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            on_signal.cancel();
        }
    });

    let printer = tokio::spawn(render_toasts(
        toasts.clone(),
        ctx.format,
        interrupt.clone(),
    ));

    let mut attempt: u32 = 0;
    let result = loop {
        match run_connection(ctx, &store, &toasts, &ride_id, &user_id, &interrupt, &mut attempt)
            .await
        {
            ConnectionEnd::Interrupted => break Ok(()),
            ConnectionEnd::Finished => {
                info!(ride_id = %ride_id, "Ride finished, watch complete");
                break Ok(());
            }
            ConnectionEnd::Dropped => {
                if policy.exhausted(attempt) {
                    break Err(anyhow::anyhow!(
                        "Giving up on ride {} after {} reconnect attempts",
                        ride_id,
                        attempt
                    ));
                }
                let delay = policy.delay_for_attempt(attempt);
                attempt += 1;
                warn!(ride_id = %ride_id, attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
                if ctx.format == OutputFormat::Text {
                    println!("Connection lost, retrying in {:.1}s", delay.as_secs_f64());
                }
                tokio::select! {
                    _ = interrupt.cancelled() => break Ok(()),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    };

    toasts.dismiss_all();
    interrupt.cancel();
    let _ = printer.await;
    result
}

/// One socket, one session. Returns when either goes away.
async fn run_connection(
    ctx: &Context,
    store: &RideStoreClient,
    toasts: &Arc<ToastQueue>,
    ride_id: &RideId,
    user_id: &UserId,
    interrupt: &CancellationToken,
    attempt: &mut u32,
) -> ConnectionEnd {
    let realtime_config = match ctx.realtime_config() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Invalid realtime configuration");
            return ConnectionEnd::Dropped;
        }
    };
    let client = tokio::select! {
        _ = interrupt.cancelled() => return ConnectionEnd::Interrupted,
        connected = RealtimeClient::connect(realtime_config) => match connected {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!(error = %e, "Realtime connect failed");
                return ConnectionEnd::Dropped;
            }
        },
    };

    let provider: Arc<dyn ChannelProvider> = client.clone();
    let sink: Arc<dyn NotificationSink> = toasts.clone();
    let session = RideSyncSession::new(
        provider,
        sink,
        ctx.sync_config(),
        tokio::runtime::Handle::current(),
    );
    let mut state_rx = session.watch();
    session.open(Some(ride_id.clone()), Some(user_id.clone()));

    let mut finished = ride_finished(refresh_ride(store, ctx, ride_id).await.as_ref());

    let mut last_seen = SyncState {
        status: ConnectionStatus::Disconnected,
        last_update: None,
        refresh_requests: 0,
    };
    let end = loop {
        let state = state_rx.borrow_and_update().clone();
        if state.status != last_seen.status {
            output::print_status(state.status, ctx.format);
            if state.status == ConnectionStatus::Connected {
                *attempt = 0;
            }
        }
        if state.refresh_requests > last_seen.refresh_requests {
            finished = ride_finished(refresh_ride(store, ctx, ride_id).await.as_ref());
        }
        let dropped = state.status == ConnectionStatus::Disconnected;
        last_seen = state;
        if finished {
            break ConnectionEnd::Finished;
        }
        if dropped {
            break ConnectionEnd::Dropped;
        }

        tokio::select! {
            _ = interrupt.cancelled() => break ConnectionEnd::Interrupted,
            _ = client.closed() => {
                debug!("Realtime socket closed");
                break ConnectionEnd::Dropped;
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break ConnectionEnd::Dropped;
                }
            }
        }
    };

    session.close();
    client.disconnect();
    end
}

async fn refresh_ride(
    store: &RideStoreClient,
    ctx: &Context,
    ride_id: &RideId,
) -> Option<RideSnapshot> {
    match store.fetch_ride(ride_id, ctx.bearer()).await {
        Ok(ride) => {
            output::print_ride(&ride, ctx.format);
            Some(ride)
        }
        Err(e) => {
            warn!(ride_id = %ride_id, error = %e, "Failed to refresh ride");
            None
        }
    }
}

/// A completed or cancelled ride will not change again.
fn ride_finished(ride: Option<&RideSnapshot>) -> bool {
    ride.is_some_and(|ride| ride.status.is_terminal())
}

/// Print toasts as they appear and purge dismissed ones after their delay.
async fn render_toasts(toasts: Arc<ToastQueue>, format: OutputFormat, stop: CancellationToken) {
    let mut events = toasts.subscribe();
    let mut purge = tokio::time::interval(TOAST_PURGE_INTERVAL);
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = purge.tick() => {
                let removed = toasts.purge_dismissed(Utc::now());
                if removed > 0 {
                    debug!(removed, "Purged dismissed toasts");
                }
            }
            event = events.recv() => match event {
                Ok(ToastEvent::Added(toast)) | Ok(ToastEvent::Updated(toast)) => {
                    output::print_toast(&toast, format);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Toast renderer lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ride(status: &str) -> RideSnapshot {
        RideSnapshot::from_row(&json!({"id": "ride-1", "status": status})).unwrap()
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(6), Duration::from_millis(30_000));
        assert_eq!(policy.delay_for_attempt(80), Duration::from_millis(30_000));
    }

    #[test]
    fn test_exhausted() {
        let policy = ReconnectPolicy {
            max_attempts: Some(2),
            ..Default::default()
        };
        assert!(!policy.exhausted(0));
        assert!(!policy.exhausted(1));
        assert!(policy.exhausted(2));

        let forever = ReconnectPolicy {
            max_attempts: None,
            ..Default::default()
        };
        assert!(!forever.exhausted(u32::MAX));
    }

    #[test]
    fn test_watch_stops_on_final_status() {
        assert!(ride_finished(Some(&ride("completed"))));
        assert!(ride_finished(Some(&ride("cancelled"))));
        assert!(!ride_finished(Some(&ride("in_progress"))));
        assert!(!ride_finished(Some(&ride("scheduled"))));
        assert!(!ride_finished(None));
    }
}
