use async_trait::async_trait;
use redis::cluster_async::ClusterConnection;
use std::fmt;
use std::time::Duration;

use super::{commands, CounterStore};
use crate::error::StoreError;

/// Counter store backed by a Redis Cluster.
///
/// Each MULTI/EXEC batch touches exactly one key, so the cluster connection
/// routes it to the node owning that key's slot and the transaction runs there
/// without cross-slot errors.
#[derive(Clone)]
pub struct RedisClusterStore {
    connection: ClusterConnection,
}

impl RedisClusterStore {
    pub fn new(connection: ClusterConnection) -> Self {
        Self { connection }
    }
}

impl fmt::Debug for RedisClusterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisClusterStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl CounterStore for RedisClusterStore {
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

    // PING has no key; the cluster connection sends it to a random node.
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        commands::ping(&mut conn).await
    }
}
