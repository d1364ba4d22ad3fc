//! Live synchronization session for one ride.
//!
//! A session owns two subscriptions: updates to the ride row and inserts into
//! the ride's messages. Each `open` gets a fresh generation and cancellation
//! token. Every event is tagged with the generation it was subscribed under
//! and is applied only while that generation is active and its token is not
//! cancelled, both checked under the session lock before anything mutates.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::fsm::{ConnectionInput, ConnectionMachine, ConnectionStatus};
use crate::interpret::{incoming_message, ride_effects};
use crate::notification::{Notification, NotificationSink};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use realtime_channel::{
    ChangeKind, ChannelEvent, ChannelHandle, ChannelProvider, LifecycleSignal, RowChange,
    Subscription,
};
use ride_types::{RideId, RideSnapshot, UserId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Identifies one open/close lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionGeneration(u64);

impl SessionGeneration {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Which of the two subscriptions an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChannelKind {
    Ride,
    Messages,
}

impl ChannelKind {
    fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Ride => "ride",
            ChannelKind::Messages => "messages",
        }
    }

    fn expected_change(&self) -> ChangeKind {
        match self {
            ChannelKind::Ride => ChangeKind::Update,
            ChannelKind::Messages => ChangeKind::Insert,
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncState {
    pub status: ConnectionStatus,
    /// Wall-clock time of the latest observed change. Never moves backwards.
    pub last_update: Option<DateTime<Utc>>,
    /// Bumped once per refresh request; consumers re-pull the ride when it
    /// changes.
    pub refresh_requests: u64,
}

struct ActiveSession {
    ride_id: RideId,
    user_id: UserId,
    generation: SessionGeneration,
    token: CancellationToken,
    handles: Vec<ChannelHandle>,
    /// Latest ride image seen in this generation; the diff baseline when the
    /// old image carries only the key.
    last_ride: Option<RideSnapshot>,
}

struct SessionCore {
    last_generation: u64,
    active: Option<ActiveSession>,
    machine: ConnectionMachine,
    last_update: Option<DateTime<Utc>>,
    refresh_requests: u64,
}

impl SessionCore {
    fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from(self.machine.state())
    }

    fn transition(&mut self, input: ConnectionInput) {
        let from = self.status();
        if self.machine.consume(&input).is_err() {
            debug!(status = %from, input = ?input, "Ignoring connection input");
        }
    }

    fn touch(&mut self) {
        let now = Utc::now();
        self.last_update = Some(match self.last_update {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    fn snapshot(&self) -> SyncState {
        SyncState {
            status: self.status(),
            last_update: self.last_update,
            refresh_requests: self.refresh_requests,
        }
    }
}

/// State shared between the session handle and its pump tasks.
struct Shared {
    core: Mutex<SessionCore>,
    sink: Arc<dyn NotificationSink>,
    state: watch::Sender<SyncState>,
}

impl Shared {
    fn publish(&self, core: &SessionCore) {
        let next = core.snapshot();
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn dispatch(&self, generation: SessionGeneration, kind: ChannelKind, event: ChannelEvent) {
        let mut core = self.core.lock();

        let (ride_id, user_id) = match core.active.as_ref() {
            Some(active) if active.generation == generation && !active.token.is_cancelled() => {
                (active.ride_id.clone(), active.user_id.clone())
            }
            _ => {
                trace!(%generation, channel = kind.as_str(), "Discarding stale event");
                return;
            }
        };

        match event {
            ChannelEvent::Lifecycle(signal) => self.on_lifecycle(&mut core, kind, signal),
            ChannelEvent::Change(change) => {
                let result = match kind {
                    ChannelKind::Ride => self.on_ride_changed(&mut core, &ride_id, &change),
                    ChannelKind::Messages => {
                        self.on_message_received(&mut core, &ride_id, &user_id, &change)
                    }
                };
                if let Err(e) = result {
                    warn!(
                        ride_id = %ride_id,
                        %generation,
                        channel = kind.as_str(),
                        error = %e,
                        "Discarding change event"
                    );
                }
            }
        }

        self.publish(&core);
    }

    fn on_lifecycle(&self, core: &mut SessionCore, kind: ChannelKind, signal: LifecycleSignal) {
        let Some(active) = core.active.as_ref() else {
            return;
        };
        let ride_id = active.ride_id.clone();
        let generation = active.generation;

        if kind == ChannelKind::Messages {
            match signal {
                LifecycleSignal::Subscribed => {
                    debug!(ride_id = %ride_id, %generation, "Message channel subscribed")
                }
                other => {
                    warn!(ride_id = %ride_id, %generation, signal = ?other, "Message channel failed")
                }
            }
            return;
        }

        match signal {
            LifecycleSignal::Subscribed => {
                core.transition(ConnectionInput::Subscribed);
                info!(ride_id = %ride_id, %generation, "Ride channel subscribed");
            }
            LifecycleSignal::ChannelError(reason) => {
                warn!(ride_id = %ride_id, %generation, reason = ?reason, "Ride channel error");
                self.fail(core, ConnectionInput::ChannelError);
            }
            LifecycleSignal::TimedOut => {
                warn!(ride_id = %ride_id, %generation, "Ride channel subscription timed out");
                self.fail(core, ConnectionInput::TimedOut);
            }
        }
    }

    /// Failures end the session. Handles stay for `close`.
    fn fail(&self, core: &mut SessionCore, input: ConnectionInput) {
        core.transition(input);
        if let Some(active) = core.active.as_ref() {
            active.token.cancel();
        }
    }

    fn on_ride_changed(
        &self,
        core: &mut SessionCore,
        ride_id: &RideId,
        change: &RowChange,
    ) -> SyncResult<()> {
        check_kind(ChannelKind::Ride, change)?;
        let last_known = core.active.as_ref().and_then(|a| a.last_ride.as_ref());
        let (snapshot, effects) = ride_effects(&change.old, &change.new, last_known)?;
        if let Some(active) = core.active.as_mut() {
            active.last_ride = Some(snapshot);
        }

        if let Some(status) = effects.notify_status {
            info!(ride_id = %ride_id, status = %status, "Ride status changed");
            self.sink
                .notify(Notification::status_changed(ride_id.clone(), status));
        }
        if effects.request_refresh {
            core.refresh_requests += 1;
        }
        if effects.touch_last_update {
            core.touch();
        }
        if effects.is_noop() {
            trace!(ride_id = %ride_id, "Ride update without observable change");
        }
        Ok(())
    }

    fn on_message_received(
        &self,
        core: &mut SessionCore,
        ride_id: &RideId,
        user_id: &UserId,
        change: &RowChange,
    ) -> SyncResult<()> {
        check_kind(ChannelKind::Messages, change)?;
        let Some(message) = incoming_message(&change.new, user_id)? else {
            trace!(ride_id = %ride_id, "Suppressing own message echo");
            return Ok(());
        };

        debug!(ride_id = %ride_id, message_id = %message.id, "Message received");
        self.sink.notify(Notification::new_message(ride_id.clone()));
        core.touch();
        Ok(())
    }
}

fn check_kind(kind: ChannelKind, change: &RowChange) -> SyncResult<()> {
    if change.kind == kind.expected_change() {
        Ok(())
    } else {
        Err(SyncError::UnexpectedChange {
            kind: change.kind.as_str(),
            channel: kind.as_str(),
        })
    }
}

/// Forward one subscription's events until the session generation ends.
async fn pump(
    shared: Arc<Shared>,
    generation: SessionGeneration,
    kind: ChannelKind,
    token: CancellationToken,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => shared.dispatch(generation, kind, event),
                None => {
                    debug!(%generation, channel = kind.as_str(), "Channel event stream ended");
                    break;
                }
            },
        }
    }
}

/// Keeps one consumer's view of a ride live.
///
/// Nothing here returns an error to the caller: provider failures show up as
/// [`ConnectionStatus::Disconnected`], teardown failures are logged.
pub struct RideSyncSession {
    provider: Arc<dyn ChannelProvider>,
    config: SyncConfig,
    runtime: Handle,
    shared: Arc<Shared>,
}

impl RideSyncSession {
    pub fn new(
        provider: Arc<dyn ChannelProvider>,
        sink: Arc<dyn NotificationSink>,
        config: SyncConfig,
        runtime: Handle,
    ) -> Self {
        let core = SessionCore {
            last_generation: 0,
            active: None,
            machine: ConnectionMachine::new(),
            last_update: None,
            refresh_requests: 0,
        };
        let (state, _) = watch::channel(core.snapshot());
        Self {
            provider,
            config,
            runtime,
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                sink,
                state,
            }),
        }
    }

    /// Start following `ride_id` on behalf of `user_id`.
    ///
    /// Any session already open on this value is torn down first. With either
    /// id absent nothing is subscribed and `None` is returned.
    pub fn open(
        &self,
        ride_id: Option<RideId>,
        user_id: Option<UserId>,
    ) -> Option<SessionGeneration> {
        let mut core = self.shared.core.lock();
        self.teardown(&mut core);

        let (Some(ride_id), Some(user_id)) = (ride_id, user_id) else {
            debug!("Ride or user id absent, not opening a session");
            self.shared.publish(&core);
            return None;
        };

        core.last_generation += 1;
        let generation = SessionGeneration(core.last_generation);
        let token = CancellationToken::new();
        core.transition(ConnectionInput::Open);
        core.active = Some(ActiveSession {
            ride_id: ride_id.clone(),
            user_id,
            generation,
            token: token.clone(),
            handles: Vec::with_capacity(2),
            last_ride: None,
        });
        info!(ride_id = %ride_id, %generation, "Opening ride sync session");

        let channels = [
            (
                ChannelKind::Ride,
                self.config.ride_channel(&ride_id, generation.value()),
            ),
            (
                ChannelKind::Messages,
                self.config.message_channel(&ride_id, generation.value()),
            ),
        ];
        for (kind, spec) in channels {
            match self.provider.subscribe(spec) {
                Ok(Subscription { handle, events }) => {
                    debug!(ride_id = %ride_id, %generation, channel = kind.as_str(), handle = %handle, "Subscribed");
                    if let Some(active) = core.active.as_mut() {
                        active.handles.push(handle);
                    }
                    self.runtime.spawn(pump(
                        self.shared.clone(),
                        generation,
                        kind,
                        token.clone(),
                        events,
                    ));
                }
                Err(e) => {
                    warn!(ride_id = %ride_id, %generation, channel = kind.as_str(), error = %e, "Subscribe failed");
                    if kind == ChannelKind::Ride {
                        self.shared.fail(&mut core, ConnectionInput::ChannelError);
                    }
                }
            }
        }

        self.shared.publish(&core);
        Some(generation)
    }

    /// Release both subscriptions and report `disconnected`. Idempotent.
    pub fn close(&self) {
        let mut core = self.shared.core.lock();
        self.teardown(&mut core);
        self.shared.publish(&core);
    }

    fn teardown(&self, core: &mut SessionCore) {
        let Some(active) = core.active.take() else {
            core.transition(ConnectionInput::Close);
            return;
        };
        active.token.cancel();

        for handle in &active.handles {
            if let Err(e) = self.provider.unsubscribe(handle) {
                warn!(ride_id = %active.ride_id, handle = %handle, error = %e, "Unsubscribe failed");
            }
        }
        core.transition(ConnectionInput::Close);
        info!(ride_id = %active.ride_id, generation = %active.generation, "Ride sync session closed");
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.core.lock().status()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.shared.core.lock().last_update
    }

    /// Number of refreshes requested so far.
    pub fn refresh_requests(&self) -> u64 {
        self.shared.core.lock().refresh_requests
    }

    /// Generation of the open session, if any.
    pub fn generation(&self) -> Option<SessionGeneration> {
        self.shared.core.lock().active.as_ref().map(|a| a.generation)
    }

    /// Ride currently followed, if any.
    pub fn ride_id(&self) -> Option<RideId> {
        self.shared
            .core
            .lock()
            .active
            .as_ref()
            .map(|a| a.ride_id.clone())
    }

    pub fn state(&self) -> SyncState {
        self.shared.core.lock().snapshot()
    }

    /// Watch status, last update and refresh requests.
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.shared.state.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn dispatch(
        &self,
        generation: SessionGeneration,
        kind: ChannelKind,
        event: ChannelEvent,
    ) {
        self.shared.dispatch(generation, kind, event);
    }
}

impl Drop for RideSyncSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for RideSyncSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("RideSyncSession")
            .field("status", &core.status())
            .field("generation", &core.active.as_ref().map(|a| a.generation))
            .finish_non_exhaustive()
    }
}
