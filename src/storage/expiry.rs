//! Expiration Registry
//!
//! Tracks, per key, an absolute deadline plus the timer task that will
//! remove the key when the deadline passes. At most one registration exists
//! per key at any time: scheduling again atomically supersedes the previous
//! timer, it never stacks.
//!
//! ## Firing Protocol
//!
//! Each registration spawns a tokio task that sleeps until the deadline and
//! then re-checks, under the store lock, that the registered deadline is
//! still its own. A reschedule or cancellation that slipped in between the
//! sleep completing and the lock being acquired makes the firing a silent
//! no-op. Firing against a key that was already deleted is likewise a
//! silent no-op.
//!
//! Deadlines are `tokio::time::Instant`s, so tests can drive expiration on
//! a paused clock.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

use crate::storage::store::{Inner, Store};

/// A single registration: the absolute deadline (consulted by TTL) and the
/// timer task that removes the key when it passes.
#[derive(Debug)]
pub(crate) struct Expiration {
    pub(crate) deadline: Instant,
    timer: JoinHandle<()>,
}

impl Expiration {
    /// Stops the pending removal. Used when a key is deleted, overwritten
    /// by a bare SET, or rescheduled.
    pub(crate) fn abort(&self) {
        self.timer.abort();
    }
}

impl Store {
    /// Sets `key` to `value` and schedules its removal after `ttl`.
    ///
    /// Any previously scheduled removal for the key is superseded.
    pub fn set_with_ttl(&self, key: String, value: String, ttl: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(key.clone(), value);
        self.schedule_expiration(&mut inner, key, ttl);
    }

    /// Schedules removal of `key` after `ttl` if the key is live.
    ///
    /// Returns false without scheduling when the key is absent.
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.evict_if_expired(key);

        if !inner.entries.contains_key(key) {
            return false;
        }

        self.schedule_expiration(&mut inner, key.to_string(), ttl);
        true
    }

    /// Registers a removal timer for `key`, superseding any previous one.
    ///
    /// Called with the store lock held so the abort-and-replace is atomic
    /// with respect to every other operation.
    fn schedule_expiration(&self, inner: &mut Inner, key: String, ttl: Duration) {
        if let Some(prev) = inner.expirations.remove(&key) {
            prev.abort();
        }

        let deadline = Instant::now() + ttl;
        let store = self.me.clone();
        let timer = tokio::spawn({
            let key = key.clone();
            async move {
                tokio::time::sleep_until(deadline).await;
                // The upgrade fails only when the store is already gone, in
                // which case there is nothing left to remove.
                if let Some(store) = store.upgrade() {
                    store.remove_on_deadline(&key, deadline);
                }
            }
        });

        trace!(key = %key, ttl_ms = ttl.as_millis() as u64, "scheduled expiration");
        inner.expirations.insert(key, Expiration { deadline, timer });
    }

    /// Timer-driven removal of `key`, valid only while `deadline` is still
    /// the registered one.
    fn remove_on_deadline(&self, key: &str, deadline: Instant) {
        let mut inner = self.inner.lock().unwrap();

        let still_current = inner
            .expirations
            .get(key)
            .is_some_and(|exp| exp.deadline == deadline);

        if still_current {
            inner.expirations.remove(key);
            inner.entries.remove(key);
            trace!(key = %key, "expired key removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::TtlResult;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn timer_removes_key_and_registration() {
        let store = Store::new();
        store.set_with_ttl("k".to_string(), "v".to_string(), Duration::from_millis(50));

        advance(Duration::from_millis(60)).await;

        assert_eq!(store.get("k"), None);
        // A later SET must start clean, with no stale registration.
        store.set("k".to_string(), "again".to_string());
        assert_eq!(store.ttl("k"), TtlResult::NoExpiry);
    }

    #[tokio::test(start_paused = true)]
    async fn firing_against_deleted_key_is_silent() {
        let store = Store::new();
        store.set_with_ttl("k".to_string(), "v".to_string(), Duration::from_millis(50));
        store.del(&["k".to_string()]);

        // The aborted timer's deadline passing must not disturb anything.
        advance(Duration::from_millis(100)).await;
        assert_eq!(store.get("k"), None);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_deadline_does_not_remove_rescheduled_key() {
        let store = Store::new();
        store.set_with_ttl("k".to_string(), "v".to_string(), Duration::from_millis(50));

        // Supersede with a much later deadline, then pass the first one.
        store.set_with_ttl("k".to_string(), "v2".to_string(), Duration::from_secs(3600));
        advance(Duration::from_millis(100)).await;

        assert_eq!(store.get("k"), Some("v2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduling_many_keys_fires_each_once() {
        let store = Store::new();
        for i in 0..20 {
            store.set_with_ttl(
                format!("key{i}"),
                "value".to_string(),
                Duration::from_millis(10 + i * 5),
            );
        }
        store.set("persistent".to_string(), "value".to_string());

        advance(Duration::from_secs(1)).await;

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("persistent"), Some("value".to_string()));
    }
}
