//! # Notification Queue
//!
//! Self-expiring list of transient messages. Each pushed message schedules
//! its own dismissal on the tokio runtime; users can dismiss earlier.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};
use vr_core::{Notification, Notifier, Severity};

/// How long a message stays visible unless dismissed earlier.
pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<Inner>,
}

struct Inner {
    next_id: AtomicU64,
    ttl: Duration,
    entries: Mutex<Vec<Notification>>,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dismiss(&self, id: u64) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|n| n.id != id);
        entries.len() != before
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner { next_id: AtomicU64::new(0), ttl, entries: Mutex::new(Vec::new()) }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Queues `message` and schedules its removal after the TTL.
    ///
    /// Outside a tokio runtime no timer can be scheduled; the message then
    /// stays until dismissed explicitly.
    pub fn push(&self, message: impl Into<String>, severity: Severity) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let message = message.into();
        debug!(id, ?severity, %message, "notification queued");
        self.inner.entries().push(Notification { id, message, severity });

        match Handle::try_current() {
            Ok(handle) => {
                let weak: Weak<Inner> = Arc::downgrade(&self.inner);
                let ttl = self.inner.ttl;
                handle.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    if let Some(inner) = weak.upgrade() {
                        inner.dismiss(id);
                    }
                });
            }
            Err(_) => warn!(id, "no tokio runtime, notification will not expire on its own"),
        }
        id
    }

    /// Shorthand for an `Info` message.
    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(message, Severity::Info)
    }

    /// Removes the message if it is still queued. Dismissing twice is a no-op.
    /// Returns whether anything was removed.
    pub fn dismiss(&self, id: u64) -> bool {
        self.inner.dismiss(id)
    }

    /// Current messages, oldest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, message: &str, severity: Severity) -> u64 {
        self.push(message, severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn messages_expire_after_ttl() {
        let queue = NotificationQueue::new(Duration::from_millis(3000));
        queue.push("saved", Severity::Success);
        assert_eq!(queue.len(), 1);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(queue.len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ids_increase_monotonically() {
        let queue = NotificationQueue::default();
        let a = queue.info("a");
        let b = queue.push("b", Severity::Error);
        assert!(b > a);
        let snap = queue.snapshot();
        assert_eq!(snap[0].severity, Severity::Info);
        assert_eq!(snap[1].message, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_is_idempotent_across_timer_and_user() {
        let queue = NotificationQueue::new(Duration::from_millis(100));
        let id = queue.info("hello");
        let other = queue.info("world");

        assert!(queue.dismiss(id));
        assert!(!queue.dismiss(id));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!queue.dismiss(id));
        assert!(!queue.dismiss(other));
        assert!(queue.is_empty());
    }

    #[test]
    fn push_without_runtime_keeps_message() {
        let queue = NotificationQueue::default();
        let id = queue.info("no timer");
        assert_eq!(queue.len(), 1);
        assert!(queue.dismiss(id));
    }
}
