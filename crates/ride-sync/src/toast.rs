//! In-process toast queue implementing [`NotificationSink`].
//!
//! Only the newest `limit` open toasts are visible. A toast pushed out of the
//! visible window is dismissed but stays addressable by id until its removal
//! delay has passed. Expired toasts are dropped on the next `push` or
//! `purge_dismissed`, so the queue stays bounded without a purge timer.

use crate::notification::{Notification, NotificationKind, NotificationSink};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use ride_types::RideId;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Identifier of a toast, unique per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// A queued toast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: ToastId,
    pub kind: NotificationKind,
    pub ride_id: RideId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Set once the toast is hidden; removal is due `remove_delay` later.
    pub dismissed_at: Option<DateTime<Utc>>,
}

impl Toast {
    /// Returns true until the toast is dismissed.
    pub fn is_open(&self) -> bool {
        self.dismissed_at.is_none()
    }
}

/// Changes broadcast to toast renderers.
#[derive(Debug, Clone, PartialEq)]
pub enum ToastEvent {
    Added(Toast),
    Updated(Toast),
    Dismissed(ToastId),
    Removed(ToastId),
}

/// Queue limits.
#[derive(Debug, Clone)]
pub struct ToastConfig {
    /// Maximum number of visible toasts.
    pub limit: usize,
    /// Delay between dismissal and removal.
    pub remove_delay: Duration,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            limit: 1,
            remove_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Default)]
struct ToastState {
    next_id: u64,
    /// Newest first.
    toasts: Vec<Toast>,
}

/// Capped, addressable toast queue.
pub struct ToastQueue {
    config: ToastConfig,
    state: Mutex<ToastState>,
    events: broadcast::Sender<ToastEvent>,
}

impl ToastQueue {
    pub fn new(config: ToastConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            config: ToastConfig {
                limit: config.limit.max(1),
                ..config
            },
            state: Mutex::new(ToastState::default()),
            events,
        }
    }

    /// Subscribe to toast changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ToastEvent> {
        self.events.subscribe()
    }

    /// Queue a notification as a new toast and return its id.
    pub fn push(&self, notification: Notification) -> ToastId {
        let now = Utc::now();
        let mut state = self.state.lock();
        self.purge_expired(&mut state, now);
        state.next_id += 1;
        let toast = Toast {
            id: ToastId(state.next_id),
            kind: notification.kind,
            ride_id: notification.ride_id,
            title: notification.title,
            body: notification.body,
            created_at: now,
            dismissed_at: None,
        };
        let id = toast.id;
        state.toasts.insert(0, toast.clone());
        let _ = self.events.send(ToastEvent::Added(toast));

        let limit = self.config.limit;
        for superseded in state.toasts.iter_mut().filter(|t| t.is_open()).skip(limit) {
            superseded.dismissed_at = Some(now);
            let _ = self.events.send(ToastEvent::Dismissed(superseded.id));
        }
        debug!(toast = %id, tracked = state.toasts.len(), "Toast queued");
        id
    }

    /// Replace title and body of a toast. Returns false for unknown ids.
    pub fn update(&self, id: ToastId, title: impl Into<String>, body: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        let Some(toast) = state.toasts.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        toast.title = title.into();
        toast.body = body.into();
        let _ = self.events.send(ToastEvent::Updated(toast.clone()));
        true
    }

    /// Hide a toast and schedule its removal. Returns false for unknown ids.
    pub fn dismiss(&self, id: ToastId) -> bool {
        let mut state = self.state.lock();
        let Some(toast) = state.toasts.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if toast.dismissed_at.is_none() {
            toast.dismissed_at = Some(Utc::now());
            let _ = self.events.send(ToastEvent::Dismissed(id));
        }
        true
    }

    /// Hide every open toast.
    pub fn dismiss_all(&self) {
        let now = Utc::now();
        let mut state = self.state.lock();
        for toast in state.toasts.iter_mut().filter(|t| t.is_open()) {
            toast.dismissed_at = Some(now);
            let _ = self.events.send(ToastEvent::Dismissed(toast.id));
        }
    }

    /// Drop a toast immediately. Returns false for unknown ids.
    pub fn remove(&self, id: ToastId) -> bool {
        let mut state = self.state.lock();
        let before = state.toasts.len();
        state.toasts.retain(|t| t.id != id);
        let removed = state.toasts.len() != before;
        if removed {
            let _ = self.events.send(ToastEvent::Removed(id));
        }
        removed
    }

    /// Remove dismissed toasts whose removal delay has elapsed at `now`.
    /// Returns how many were removed.
    pub fn purge_dismissed(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.lock();
        self.purge_expired(&mut state, now)
    }

    fn purge_expired(&self, state: &mut ToastState, now: DateTime<Utc>) -> usize {
        let delay = chrono::Duration::from_std(self.config.remove_delay)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let mut expired = Vec::new();
        state.toasts.retain(|t| match t.dismissed_at {
            Some(at) if at + delay <= now => {
                expired.push(t.id);
                false
            }
            _ => true,
        });
        for id in &expired {
            let _ = self.events.send(ToastEvent::Removed(*id));
        }
        expired.len()
    }

    /// Toasts currently shown, newest first.
    pub fn visible(&self) -> Vec<Toast> {
        let state = self.state.lock();
        state
            .toasts
            .iter()
            .filter(|t| t.is_open())
            .take(self.config.limit)
            .cloned()
            .collect()
    }

    /// Look up any tracked toast, visible or not.
    pub fn get(&self, id: ToastId) -> Option<Toast> {
        self.state.lock().toasts.iter().find(|t| t.id == id).cloned()
    }

    /// Number of tracked toasts.
    pub fn len(&self) -> usize {
        self.state.lock().toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove_delay(&self) -> Duration {
        self.config.remove_delay
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(ToastConfig::default())
    }
}

impl NotificationSink for ToastQueue {
    fn notify(&self, notification: Notification) {
        self.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ride_types::RideStatus;

    fn ride() -> RideId {
        RideId::parse("ride-1").unwrap()
    }

    #[test]
    fn test_new_toast_supersedes_visible_slot() {
        let queue = ToastQueue::default();
        let first = queue.push(Notification::new_message(ride()));
        let second = queue.push(Notification::status_changed(ride(), RideStatus::Completed));

        let visible = queue.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, second);

        // The superseded toast is still addressable.
        assert!(queue.get(first).is_some());
        assert!(queue.update(first, "Old", "still here"));
        assert_eq!(queue.get(first).unwrap().body, "still here");
        assert!(queue.dismiss(first));
    }

    #[test]
    fn test_larger_limit() {
        let queue = ToastQueue::new(ToastConfig {
            limit: 3,
            remove_delay: Duration::from_secs(1),
        });
        for _ in 0..5 {
            queue.push(Notification::new_message(ride()));
        }
        assert_eq!(queue.visible().len(), 3);
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn test_dismiss_then_purge_after_delay() {
        let queue = ToastQueue::new(ToastConfig {
            limit: 1,
            remove_delay: Duration::from_secs(10),
        });
        let id = queue.push(Notification::new_message(ride()));
        assert!(queue.dismiss(id));
        assert!(queue.visible().is_empty());

        let dismissed_at = queue.get(id).unwrap().dismissed_at.unwrap();
        assert_eq!(queue.purge_dismissed(dismissed_at), 0);
        assert_eq!(
            queue.purge_dismissed(dismissed_at + chrono::Duration::seconds(10)),
            1
        );
        assert!(queue.get(id).is_none());
    }

    #[test]
    fn test_push_drops_expired_toasts() {
        let queue = ToastQueue::new(ToastConfig {
            limit: 1,
            remove_delay: Duration::ZERO,
        });
        let mut rx = queue.subscribe();
        let mut ids = Vec::new();
        for _ in 0..10 {
            ids.push(queue.push(Notification::new_message(ride())));
        }

        // Each push supersedes the previous toast and drops the one before it.
        assert_eq!(queue.len(), 2);
        assert!(queue.get(ids[0]).is_none());
        assert_eq!(queue.visible()[0].id, ids[9]);
        let mut removed = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ToastEvent::Removed(_)) {
                removed += 1;
            }
        }
        assert_eq!(removed, 8);
    }

    #[test]
    fn test_unknown_ids() {
        let queue = ToastQueue::default();
        let id = queue.push(Notification::new_message(ride()));
        assert!(queue.remove(id));
        assert!(!queue.remove(id));
        assert!(!queue.dismiss(id));
        assert!(!queue.update(id, "t", "b"));
    }

    #[test]
    fn test_dismiss_all() {
        let queue = ToastQueue::new(ToastConfig {
            limit: 2,
            remove_delay: Duration::from_secs(1),
        });
        queue.push(Notification::new_message(ride()));
        queue.push(Notification::new_message(ride()));
        queue.dismiss_all();
        assert!(queue.visible().is_empty());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_events_broadcast() {
        let queue = ToastQueue::default();
        let mut rx = queue.subscribe();

        let first = queue.push(Notification::new_message(ride()));
        let second = queue.push(Notification::new_message(ride()));

        assert!(matches!(rx.try_recv().unwrap(), ToastEvent::Added(t) if t.id == first));
        assert!(matches!(rx.try_recv().unwrap(), ToastEvent::Added(t) if t.id == second));
        assert_eq!(rx.try_recv().unwrap(), ToastEvent::Dismissed(first));
    }

    #[test]
    fn test_sink_contract() {
        let queue = ToastQueue::default();
        let sink: &dyn NotificationSink = &queue;
        sink.notify(Notification::status_changed(ride(), RideStatus::InProgress));
        assert_eq!(queue.visible()[0].title, "Ride Status Updated");
    }
}
