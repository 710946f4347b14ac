use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::{parse_counter, CounterStore};
use crate::error::StoreError;

/// Minimum time between expiry sweeps triggered by writes.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Stored value with an optional expiry deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, Entry>,
    swept_at: Option<Instant>,
}

impl Entries {
    /// Drop every expired entry, returning how many were removed.
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| !entry.is_expired(now));
        self.swept_at = Some(now);
        before - self.map.len()
    }

    /// Sweep unless one ran within the last [`SWEEP_INTERVAL`].
    fn maybe_sweep(&mut self, now: Instant) {
        let due = self
            .swept_at
            .map_or(true, |last| now.saturating_duration_since(last) >= SWEEP_INTERVAL);
        if due {
            self.sweep(now);
        }
    }

    fn insert(&mut self, key: &str, entry: Entry, now: Instant) {
        self.maybe_sweep(now);
        self.map.insert(key.to_string(), entry);
    }
}

/// In-process counter store.
///
/// Follows Redis semantics for the commands the limiter uses: `INCR` on an
/// absent key starts at 1 without an expiry, and expired keys behave exactly
/// like absent ones. Expiry is measured with `tokio::time::Instant`, so a
/// paused test runtime controls it. Clones share the same entries.
///
/// Expired keys are dropped when read, swept on writes at most once per
/// second, and on every [`MemoryStore::purge_expired`] call.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value, bypassing counter semantics.
    pub fn insert_raw(
        &self,
        key: &str,
        value: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        entries.insert(
            key,
            Entry {
                value: value.into(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
            now,
        );
        Ok(())
    }

    /// Remaining time-to-live of a key, `None` if it is absent or never expires.
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        Ok(live_entry(&mut entries.map, key, now)
            .and_then(|entry| entry.expires_at)
            .map(|deadline| deadline.saturating_duration_since(now)))
    }

    /// Drop all expired keys, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.sweep(Instant::now()))
    }

    /// Number of live keys.
    pub fn len(&self) -> Result<usize, StoreError> {
        let mut entries = self.lock()?;
        entries.sweep(Instant::now());
        Ok(entries.map.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, StoreError> {
        self.entries
            .lock()
            .map_err(|e| StoreError::Internal(format!("lock poisoned: {}", e)))
    }

    fn add_one(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let (current, expires_at) = match live_entry(&mut entries.map, key, now) {
            Some(entry) => (
                parse_counter(key, Some(entry.value.clone()))?,
                entry.expires_at,
            ),
            None => (0, None),
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::Internal(format!("increment would overflow {key:?}")))?;

        entries.insert(
            key,
            Entry {
                value: next.to_string(),
                expires_at: ttl.map(|ttl| now + ttl).or(expires_at),
            },
            now,
        );
        Ok(next)
    }
}

/// Look up a key, dropping it first if its deadline has passed.
fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a Entry> {
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
    }
    entries.get(key)
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn initialize(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.insert_raw(key, "1", Some(ttl))
    }

    async fn increment(&self, key: &str) -> Result<(), StoreError> {
        self.add_one(key, None).map(|_| ())
    }

    async fn arm_cooldown(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.add_one(key, Some(ttl)).map(|_| ())
    }

    async fn read(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.lock()?;
        let raw =
            live_entry(&mut entries.map, key, Instant::now()).map(|entry| entry.value.clone());
        parse_counter(key, raw)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.map.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
