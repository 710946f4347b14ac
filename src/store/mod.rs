//! Counter store adapters.
//!
//! A [`CounterStore`] is the only way the limiter touches shared state. Every
//! realization keeps one integer per key with an attached time-to-live and
//! must apply [`CounterStore::initialize`] and [`CounterStore::arm_cooldown`]
//! as single atomic units: no observer may see the new value with the old
//! expiry, or the reverse.
//!
//! Realizations:
//! - [`RedisStore`]: one Redis endpoint behind a `ConnectionManager`
//! - [`RedisClusterStore`]: a Redis Cluster; every transaction names one key,
//!   so it runs on that key's slot owner
//! - [`MemoryStore`]: in-process, for tests and single-instance deployments

mod cluster;
mod commands;
mod memory;
mod redis;

pub use self::cluster::RedisClusterStore;
pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;

/// Atomic counter operations the limiter relies on.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Set the counter to 1 and its time-to-live to `ttl`, atomically.
    async fn initialize(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Add 1 to the counter without touching its time-to-live.
    async fn increment(&self, key: &str) -> Result<(), StoreError>;

    /// Add 1 to the counter and set its time-to-live to `ttl`, atomically.
    async fn arm_cooldown(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Current counter value; 0 when the key is absent or expired.
    async fn read(&self, key: &str) -> Result<i64, StoreError>;

    /// Delete the counter. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: CounterStore + ?Sized> CounterStore for Arc<S> {
    async fn initialize(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        (**self).initialize(key, ttl).await
    }

    async fn increment(&self, key: &str) -> Result<(), StoreError> {
        (**self).increment(key).await
    }

    async fn arm_cooldown(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        (**self).arm_cooldown(key, ttl).await
    }

    async fn read(&self, key: &str) -> Result<i64, StoreError> {
        (**self).read(key).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        (**self).ping().await
    }
}

/// Interpret a raw stored value as a counter, treating absence as zero.
pub(crate) fn parse_counter(key: &str, raw: Option<String>) -> Result<i64, StoreError> {
    match raw {
        None => Ok(0),
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map_err(|_| StoreError::NotAnInteger {
                key: key.to_string(),
                value,
            }),
    }
}

/// Expiry in whole seconds, never below one second.
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
