use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::fmt;
use std::time::Duration;

use super::{commands, CounterStore};
use crate::error::StoreError;

/// Counter store backed by a single Redis endpoint.
///
/// The `ConnectionManager` is owned by the caller; it is multiplexed and
/// reconnects on its own, so each call works on a cheap clone of it.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn initialize(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        commands::initialize(&mut conn, key, ttl).await
    }

    async fn increment(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        commands::increment(&mut conn, key).await
    }

    async fn arm_cooldown(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        commands::arm_cooldown(&mut conn, key, ttl).await
    }

    async fn read(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection.clone();
        commands::read(&mut conn, key).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        commands::remove(&mut conn, key).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        commands::ping(&mut conn).await
    }
}
