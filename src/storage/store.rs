//! Key-Value Store
//!
//! The store owns the mapping from key to value and coordinates with the
//! expiration registry so that a key past its expiry instant is treated as
//! absent on every access path, even when the removal timer has not fired
//! yet.
//!
//! ## Design Decisions
//!
//! 1. **Single Lock**: one `Mutex` guards the entries and the expiration
//!    registry together, so every operation is atomic with respect to
//!    concurrent connections and timer firings.
//! 2. **Strings All The Way**: a value is always a string. INCR and DECR
//!    parse it as a base-10 integer and store the result back as its
//!    decimal representation; there is no union value type.
//! 3. **Timer + Lazy Expiry**: removal is driven by per-key timers, with a
//!    read-time deadline check as a safety net for the window between a
//!    deadline passing and its timer running.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::storage::expiry::Expiration;

/// Error for INCR/DECR against a value that is not an integer.
///
/// The stored value is left unchanged when this is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    #[error("value is not an integer")]
    NotAnInteger,

    #[error("increment or decrement would overflow")]
    Overflow,
}

/// Outcome of a TTL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlResult {
    /// The key does not exist (wire integer -2)
    NoSuchKey,
    /// The key exists but carries no expiration (wire integer -1)
    NoExpiry,
    /// Whole seconds remaining, rounded up, always positive
    SecondsRemaining(i64),
}

impl TtlResult {
    /// The integer this result encodes to on the wire.
    pub fn as_wire_integer(&self) -> i64 {
        match self {
            TtlResult::NoSuchKey => -2,
            TtlResult::NoExpiry => -1,
            TtlResult::SecondsRemaining(n) => *n,
        }
    }
}

/// The shared key-value store.
///
/// Created once at server start, wrapped in an `Arc`, and handed to every
/// connection task and expiration timer. All operations lock the single
/// inner mutex for their duration, which keeps each one atomic.
///
/// # Example
///
/// ```
/// use emberkv::storage::Store;
///
/// let store = Store::new();
/// store.set("name".to_string(), "ember".to_string());
/// assert_eq!(store.get("name"), Some("ember".to_string()));
/// ```
#[derive(Debug)]
pub struct Store {
    pub(crate) inner: Mutex<Inner>,

    /// Weak handle to ourselves, given to expiration timer tasks. Weak so
    /// the registry never keeps a dropped store alive through its timers.
    pub(crate) me: Weak<Store>,
}

/// State behind the lock: the value mapping and the expiration registry.
#[derive(Debug, Default)]
pub(crate) struct Inner {
    pub(crate) entries: HashMap<String, String>,
    pub(crate) expirations: HashMap<String, Expiration>,
}

impl Inner {
    /// Removes `key` inline if its deadline has passed, aborting the timer
    /// that would otherwise have removed it.
    pub(crate) fn evict_if_expired(&mut self, key: &str) {
        let expired = self
            .expirations
            .get(key)
            .is_some_and(|exp| exp.deadline <= Instant::now());
        if expired {
            if let Some(exp) = self.expirations.remove(key) {
                exp.abort();
            }
            self.entries.remove(key);
        }
    }

    /// Removes every key whose deadline has passed.
    pub(crate) fn purge_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .expirations
            .iter()
            .filter(|(_, exp)| exp.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            if let Some(exp) = self.expirations.remove(&key) {
                exp.abort();
            }
            self.entries.remove(&key);
        }
    }
}

impl Store {
    /// Creates an empty store.
    ///
    /// The store is always handed out behind an `Arc` because expiration
    /// timers hold a handle back to it.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            inner: Mutex::new(Inner::default()),
            me: me.clone(),
        })
    }

    /// Unconditionally sets `key` to `value`.
    ///
    /// A pre-existing expiration on the key is cancelled: the overwritten
    /// entry is a fresh one with no expiry.
    pub fn set(&self, key: String, value: String) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(exp) = inner.expirations.remove(&key) {
            exp.abort();
        }
        inner.entries.insert(key, value);
    }

    /// Returns the value for `key`, or `None` if the key was never set,
    /// was deleted, or is past its expiry instant.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.evict_if_expired(key);
        inner.entries.get(key).cloned()
    }

    /// Deletes each present key, cancelling any pending expiration.
    ///
    /// Returns the number of keys actually removed.
    pub fn del(&self, keys: &[String]) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let mut removed = 0;
        for key in keys {
            inner.evict_if_expired(key);
            if inner.entries.remove(key).is_some() {
                if let Some(exp) = inner.expirations.remove(key) {
                    exp.abort();
                }
                removed += 1;
            }
        }
        removed
    }

    /// Counts how many of the given keys are currently live.
    ///
    /// A key named twice is counted twice.
    pub fn exists(&self, keys: &[String]) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let mut count = 0;
        for key in keys {
            inner.evict_if_expired(key);
            if inner.entries.contains_key(key) {
                count += 1;
            }
        }
        count
    }

    /// Increments the integer value of `key` by one.
    ///
    /// A missing key reads as `"0"`, so the first INCR yields 1.
    pub fn incr(&self, key: &str) -> Result<i64, ValueError> {
        self.adjust(key, 1)
    }

    /// Decrements the integer value of `key` by one.
    pub fn decr(&self, key: &str) -> Result<i64, ValueError> {
        self.adjust(key, -1)
    }

    fn adjust(&self, key: &str, delta: i64) -> Result<i64, ValueError> {
        let mut inner = self.inner.lock().unwrap();
        inner.evict_if_expired(key);

        let current = match inner.entries.get(key) {
            Some(value) => value.parse::<i64>().map_err(|_| ValueError::NotAnInteger)?,
            None => 0,
        };

        let next = current.checked_add(delta).ok_or(ValueError::Overflow)?;

        // The expiration registry is untouched: adjusting a counter keeps
        // whatever deadline the key already had.
        inner.entries.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    /// Queries the remaining time-to-live for `key`.
    pub fn ttl(&self, key: &str) -> TtlResult {
        let mut inner = self.inner.lock().unwrap();
        inner.evict_if_expired(key);

        if !inner.entries.contains_key(key) {
            return TtlResult::NoSuchKey;
        }

        match inner.expirations.get(key) {
            None => TtlResult::NoExpiry,
            Some(exp) => {
                let remaining = exp.deadline.saturating_duration_since(Instant::now());
                // Ceiling in whole seconds. The eviction above guarantees a
                // positive remainder, so this never reports zero or less.
                TtlResult::SecondsRemaining(remaining.as_millis().div_ceil(1000) as i64)
            }
        }
    }

    /// Returns all live keys matching `pattern`.
    ///
    /// The pattern is a glob where `*` matches any run of characters and
    /// `?` matches exactly one; the whole key must match. Order is not
    /// guaranteed.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.purge_expired();

        let matcher = GlobPattern::new(pattern);
        inner
            .entries
            .keys()
            .filter(|key| matcher.matches(key))
            .cloned()
            .collect()
    }

    /// The number of live keys.
    pub fn len(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.purge_expired();
        inner.entries.len()
    }

    /// Returns true if no live keys exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Anchored glob matcher for the KEYS command.
///
/// Matching is over characters, not bytes, so `?` consumes exactly one
/// character even in multi-byte keys.
struct GlobPattern {
    pattern: Vec<char>,
}

impl GlobPattern {
    fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.chars().collect(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().collect();
        Self::matches_at(&self.pattern, &text)
    }

    fn matches_at(pattern: &[char], text: &[char]) -> bool {
        match pattern.first() {
            None => text.is_empty(),
            Some('*') => (0..=text.len()).any(|i| Self::matches_at(&pattern[1..], &text[i..])),
            Some('?') => !text.is_empty() && Self::matches_at(&pattern[1..], &text[1..]),
            Some(&c) => {
                !text.is_empty() && text[0] == c && Self::matches_at(&pattern[1..], &text[1..])
            }
        }
    }
}
