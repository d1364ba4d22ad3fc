//! Supabase Realtime websocket client.

use crate::config::RealtimeConfig;
use crate::error::{RealtimeError, RealtimeResult};
use crate::protocol::{
    PhoenixMessage, PostgresChangesPayload, ReplyPayload, SystemPayload, EVENT_CLOSE, EVENT_ERROR,
    EVENT_POSTGRES_CHANGES, EVENT_REPLY, EVENT_SYSTEM, PHOENIX_TOPIC,
};
use crate::provider::{
    ChangeKind, ChannelEvent, ChannelHandle, ChannelProvider, ChannelSpec, LifecycleSignal,
    Subscription,
};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Join progress of a registered channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinState {
    Joining,
    Joined,
    Failed,
}

struct ChannelEntry {
    handle_id: u64,
    event: ChangeKind,
    join_ref: String,
    state: JoinState,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

impl ChannelEntry {
    fn signal(&self, signal: LifecycleSignal) {
        let _ = self.events.send(ChannelEvent::Lifecycle(signal));
    }

    fn fail(&mut self, signal: LifecycleSignal) {
        if self.state != JoinState::Failed {
            self.state = JoinState::Failed;
            self.signal(signal);
        }
    }
}

struct ClientInner {
    config: RealtimeConfig,
    outbound: mpsc::UnboundedSender<Message>,
    channels: Mutex<HashMap<String, ChannelEntry>>,
    pending_heartbeat: Mutex<Option<String>>,
    next_ref: AtomicU64,
    next_handle: AtomicU64,
    connected: AtomicBool,
    shutdown: CancellationToken,
    runtime: tokio::runtime::Handle,
}

impl ClientInner {
    fn make_ref(&self) -> String {
        (self.next_ref.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    fn push(&self, frame: &PhoenixMessage) -> RealtimeResult<()> {
        let json = frame.to_json()?;
        self.outbound
            .send(Message::Text(json.into()))
            .map_err(|e| RealtimeError::Send(e.to_string()))
    }

    /// Route an incoming frame to the channel it belongs to.
    fn route(&self, msg: PhoenixMessage) {
        if msg.topic == PHOENIX_TOPIC {
            if msg.event == EVENT_REPLY {
                let mut pending = self.pending_heartbeat.lock();
                if pending.is_some() && *pending == msg.msg_ref {
                    *pending = None;
                }
            }
            return;
        }

        let mut channels = self.channels.lock();
        let Some(entry) = channels.get_mut(&msg.topic) else {
            debug!(topic = %msg.topic, event = %msg.event, "Frame for unknown topic");
            return;
        };

        // Frames from an earlier join of the same topic.
        if let Some(join_ref) = msg.join_ref.as_deref() {
            if join_ref != entry.join_ref {
                debug!(topic = %msg.topic, join_ref, "Frame for stale join");
                return;
            }
        }

        match msg.event.as_str() {
            EVENT_REPLY => {
                if msg.msg_ref.as_deref() != Some(entry.join_ref.as_str()) {
                    return;
                }
                let reply: ReplyPayload = match serde_json::from_value(msg.payload) {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(topic = %msg.topic, error = %e, "Malformed join reply");
                        entry.fail(LifecycleSignal::ChannelError(Some(e.to_string())));
                        return;
                    }
                };
                if entry.state != JoinState::Joining {
                    return;
                }
                if reply.is_ok() {
                    entry.state = JoinState::Joined;
                    info!(topic = %msg.topic, "Channel subscribed");
                    entry.signal(LifecycleSignal::Subscribed);
                } else {
                    let reason = reply.reason();
                    warn!(topic = %msg.topic, reason = ?reason, "Channel join rejected");
                    entry.fail(LifecycleSignal::ChannelError(reason));
                }
            }
            EVENT_ERROR | EVENT_CLOSE => {
                warn!(topic = %msg.topic, event = %msg.event, "Channel dropped by server");
                entry.fail(LifecycleSignal::ChannelError(Some(msg.event.clone())));
            }
            EVENT_SYSTEM => match serde_json::from_value::<SystemPayload>(msg.payload) {
                Ok(system) if system.is_error() => {
                    warn!(topic = %msg.topic, message = ?system.message, "Realtime extension error");
                    entry.fail(LifecycleSignal::ChannelError(system.message));
                }
                Ok(system) => {
                    debug!(topic = %msg.topic, message = ?system.message, "Realtime system message");
                }
                Err(e) => {
                    debug!(topic = %msg.topic, error = %e, "Unparsed system message");
                }
            },
            EVENT_POSTGRES_CHANGES => {
                let payload: PostgresChangesPayload = match serde_json::from_value(msg.payload) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(topic = %msg.topic, error = %e, "Malformed postgres_changes payload");
                        return;
                    }
                };
                if let Some(change) = payload.data.into_row_change() {
                    if change.kind == entry.event {
                        let _ = entry.events.send(ChannelEvent::Change(change));
                    }
                }
            }
            other => {
                debug!(topic = %msg.topic, event = other, "Ignoring frame");
            }
        }
    }

    /// Report a join timeout unless the join was answered meanwhile.
    fn expire_join(&self, topic: &str, handle_id: u64) {
        let mut channels = self.channels.lock();
        if let Some(entry) = channels.get_mut(topic) {
            if entry.handle_id == handle_id && entry.state == JoinState::Joining {
                warn!(topic, "Channel join timed out");
                entry.fail(LifecycleSignal::TimedOut);
            }
        }
    }

    /// Tear down after the socket died. Every live channel hears about it.
    fn mark_disconnected(&self, reason: &str) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        warn!(reason, "Realtime socket disconnected");
        let mut channels = self.channels.lock();
        for (_, mut entry) in channels.drain() {
            entry.fail(LifecycleSignal::ChannelError(Some(reason.to_string())));
        }
        self.shutdown.cancel();
    }
}

/// Websocket client for Supabase Realtime `postgres_changes` channels.
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

impl RealtimeClient {
    /// Connect to the realtime socket and start the reader, writer and
    /// heartbeat tasks.
    pub async fn connect(config: RealtimeConfig) -> RealtimeResult<Self> {
        let url = config.websocket_url()?;
        info!(host = ?url.host_str(), "Connecting to realtime");

        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        let inner = Arc::new(ClientInner {
            config,
            outbound: outbound_tx,
            channels: Mutex::new(HashMap::new()),
            pending_heartbeat: Mutex::new(None),
            next_ref: AtomicU64::new(0),
            next_handle: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
            runtime: tokio::runtime::Handle::current(),
        });

        // Writer
        let shutdown = inner.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    maybe_msg = outbound_rx.recv() => {
                        match maybe_msg {
                            Some(msg) => {
                                if let Err(e) = write.send(msg).await {
                                    error!(error = %e, "Realtime write failed");
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        // Reader
        let reader = inner.clone();
        tokio::spawn(async move {
            let reason = loop {
                tokio::select! {
                    _ = reader.shutdown.cancelled() => break "client shutdown",
                    next = read.next() => {
                        match next {
                            Some(Ok(Message::Text(text))) => match PhoenixMessage::from_json(&text) {
                                Ok(msg) => reader.route(msg),
                                Err(e) => warn!(error = %e, "Failed to parse realtime frame"),
                            },
                            Some(Ok(Message::Ping(data))) => {
                                let _ = reader.outbound.send(Message::Pong(data));
                            }
                            Some(Ok(Message::Close(_))) => {
                                info!("Realtime connection closed by server");
                                break "socket closed";
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!(error = %e, "Realtime websocket error");
                                break "websocket error";
                            }
                            None => break "socket closed",
                        }
                    }
                }
            };
            reader.mark_disconnected(reason);
        });

        // Heartbeat
        let heartbeat = inner.clone();
        tokio::spawn(async move {
            let mut ticker = interval(heartbeat.config.heartbeat_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick fires immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = heartbeat.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if heartbeat.pending_heartbeat.lock().is_some() {
                            heartbeat.mark_disconnected("heartbeat timeout");
                            break;
                        }
                        let msg_ref = heartbeat.make_ref();
                        *heartbeat.pending_heartbeat.lock() = Some(msg_ref.clone());
                        if let Err(e) = heartbeat.push(&PhoenixMessage::heartbeat(&msg_ref)) {
                            warn!(error = %e, "Failed to send heartbeat");
                            heartbeat.mark_disconnected("heartbeat send failed");
                            break;
                        }
                    }
                }
            }
        });

        info!("Connected to realtime");
        Ok(Self { inner })
    }

    /// Check if the socket is still usable.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Resolves once the socket has shut down for any reason.
    pub async fn closed(&self) {
        self.inner.shutdown.cancelled().await;
    }

    /// Number of registered channels.
    pub fn channel_count(&self) -> usize {
        self.inner.channels.lock().len()
    }

    /// Close the socket. Registered channels are dropped without signals.
    pub fn disconnect(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.channels.lock().clear();
        self.inner.shutdown.cancel();
        info!("Disconnected from realtime");
    }
}

impl ChannelProvider for RealtimeClient {
    fn subscribe(&self, spec: ChannelSpec) -> RealtimeResult<Subscription> {
        if !self.is_connected() {
            return Err(RealtimeError::NotConnected);
        }

        let topic = spec.topic();
        let handle_id = self.inner.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        let join_ref = self.inner.make_ref();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        {
            let mut channels = self.inner.channels.lock();
            if channels.contains_key(&topic) {
                return Err(RealtimeError::DuplicateChannel(topic));
            }
            channels.insert(
                topic.clone(),
                ChannelEntry {
                    handle_id,
                    event: spec.event,
                    join_ref: join_ref.clone(),
                    state: JoinState::Joining,
                    events: events_tx,
                },
            );
        }

        let token = self.inner.config.access_token.as_deref();
        if let Err(e) = self
            .inner
            .push(&PhoenixMessage::join(&spec, &join_ref, token))
        {
            self.inner.channels.lock().remove(&topic);
            return Err(e);
        }
        debug!(topic = %topic, table = %spec.table, filter = %spec.filter, "Joining channel");

        let inner = self.inner.clone();
        let timeout_topic = topic.clone();
        self.inner.runtime.spawn(async move {
            tokio::select! {
                _ = inner.shutdown.cancelled() => {}
                _ = sleep(inner.config.join_timeout) => inner.expire_join(&timeout_topic, handle_id),
            }
        });

        Ok(Subscription {
            handle: ChannelHandle::new(topic, handle_id),
            events: events_rx,
        })
    }

    fn unsubscribe(&self, handle: &ChannelHandle) -> RealtimeResult<()> {
        let entry = {
            let mut channels = self.inner.channels.lock();
            match channels.get(handle.topic()) {
                Some(entry) if entry.handle_id == handle.id() => channels.remove(handle.topic()),
                _ => None,
            }
        };
        let Some(entry) = entry else {
            return Err(RealtimeError::UnknownChannel(handle.to_string()));
        };

        if !self.is_connected() {
            return Err(RealtimeError::NotConnected);
        }

        let msg_ref = self.inner.make_ref();
        self.inner
            .push(&PhoenixMessage::leave(handle.topic(), &msg_ref, &entry.join_ref))?;
        debug!(topic = handle.topic(), "Left channel");
        Ok(())
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
