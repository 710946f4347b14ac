//! Integration tests against live Redis servers.
//!
//! Single-node tests expect Redis at `redis://127.0.0.1:6379`, cluster tests a
//! cluster on ports 7000-7005. They are ignored by default; run with
//! `cargo test --test redis_tests -- --ignored`.

use std::time::Duration;

use lockout::{
    CounterStore, LimiterError, RateLimitPolicy, RateLimiter, RedisClusterStore, RedisStore,
    StoreError,
};
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::cluster::ClusterClient;
use tokio_test::{assert_err, assert_ok};

const REDIS_URL: &str = "redis://127.0.0.1:6379";
const CLUSTER_NODES: [&str; 6] = [
    "redis://127.0.0.1:7000",
    "redis://127.0.0.1:7001",
    "redis://127.0.0.1:7002",
    "redis://127.0.0.1:7003",
    "redis://127.0.0.1:7004",
    "redis://127.0.0.1:7005",
];

fn policy() -> RateLimitPolicy {
    RateLimitPolicy::new(3, 15, 60).unwrap()
}

async fn connection() -> ConnectionManager {
    let client = redis::Client::open(REDIS_URL).expect("Failed to create Redis client");
    ConnectionManager::new(client)
        .await
        .expect("Failed to connect to Redis")
}

async fn cluster_connection() -> redis::cluster_async::ClusterConnection {
    ClusterClient::new(CLUSTER_NODES.to_vec())
        .expect("Failed to create cluster client")
        .get_async_connection()
        .await
        .expect("Failed to connect to Redis Cluster")
}

async fn ttl<C: ConnectionLike + Send>(conn: &mut C, key: &str) -> i64 {
    redis::cmd("TTL").arg(key).query_async(conn).await.unwrap()
}

async fn get<C: ConnectionLike + Send>(conn: &mut C, key: &str) -> i64 {
    redis::cmd("GET").arg(key).query_async(conn).await.unwrap()
}

async fn clear<C: ConnectionLike + Send>(conn: &mut C, key: &str) {
    redis::cmd("DEL")
        .arg(key)
        .query_async::<_, ()>(conn)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_counter_lifecycle() {
    let mut conn = connection().await;
    let key = "lockout:test:lifecycle";
    clear(&mut conn, key).await;
    let limiter = RateLimiter::new(RedisStore::new(conn.clone()), policy());

    assert_ok!(limiter.run(key).await);
    assert_eq!(get(&mut conn, key).await, 1);
    assert_eq!(ttl(&mut conn, key).await, 15);

    assert_ok!(limiter.run(key).await);
    assert_ok!(limiter.run(key).await);
    assert_eq!(get(&mut conn, key).await, 3);

    let err = assert_err!(limiter.run(key).await);
    assert!(err.is_blocked());
    assert_eq!(get(&mut conn, key).await, 4);
    assert_eq!(ttl(&mut conn, key).await, 60);

    assert!(assert_err!(limiter.run(key).await).is_blocked());
    assert_eq!(get(&mut conn, key).await, 4);

    assert!(limiter.rate_limit_exceeded(key).await);
    assert_ok!(limiter.reset(key).await);
    assert!(!limiter.rate_limit_exceeded(key).await);
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_non_integer_value() {
    let mut conn = connection().await;
    let key = "lockout:test:invalid";
    redis::cmd("SET")
        .arg(key)
        .arg("invalid_data")
        .arg("EX")
        .arg(60)
        .query_async::<_, ()>(&mut conn)
        .await
        .unwrap();
    let limiter = RateLimiter::new(RedisStore::new(conn.clone()), policy());

    let err = assert_err!(limiter.run(key).await);
    assert!(matches!(
        err,
        LimiterError::Store(StoreError::NotAnInteger { .. })
    ));
    assert!(!limiter.rate_limit_exceeded(key).await);

    clear(&mut conn, key).await;
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_increment_keeps_ttl() {
    let mut conn = connection().await;
    let key = "lockout:test:increment";
    clear(&mut conn, key).await;
    let store = RedisStore::new(conn.clone());

    store.initialize(key, Duration::from_secs(100)).await.unwrap();
    store.increment(key).await.unwrap();

    assert_eq!(get(&mut conn, key).await, 2);
    assert!(ttl(&mut conn, key).await > 90);

    store.remove(key).await.unwrap();
    store.remove(key).await.unwrap();
    assert_eq!(store.read(key).await.unwrap(), 0);
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_ping() {
    let store = RedisStore::new(connection().await);
    assert_ok!(store.ping().await);
}

#[tokio::test]
#[ignore] // Requires Redis Cluster
async fn test_cluster_counter_lifecycle() {
    let mut conn = cluster_connection().await;
    let key = "login";
    clear(&mut conn, key).await;
    let limiter = RateLimiter::new(RedisClusterStore::new(conn.clone()), policy());

    for _ in 0..3 {
        assert_ok!(limiter.run(key).await);
    }
    assert_eq!(get(&mut conn, key).await, 3);
    assert_eq!(ttl(&mut conn, key).await, 15);

    assert!(assert_err!(limiter.run(key).await).is_blocked());
    assert_eq!(ttl(&mut conn, key).await, 60);
    assert!(limiter.rate_limit_exceeded(key).await);

    assert_ok!(limiter.reset(key).await);
    assert!(!limiter.rate_limit_exceeded(key).await);
}

#[tokio::test]
#[ignore] // Requires Redis Cluster
async fn test_cluster_zero_attempts_is_exceeded_after_first_run() {
    let mut conn = cluster_connection().await;
    let key = "login:zero";
    clear(&mut conn, key).await;
    let policy = RateLimitPolicy::new(0, 10, 10).unwrap();
    let limiter = RateLimiter::new(RedisClusterStore::new(conn.clone()), policy);

    assert!(!limiter.rate_limit_exceeded(key).await);
    assert_ok!(limiter.run(key).await);
    assert!(limiter.rate_limit_exceeded(key).await);

    clear(&mut conn, key).await;
}

#[tokio::test]
#[ignore] // Requires Redis Cluster
async fn test_cluster_non_integer_value() {
    let mut conn = cluster_connection().await;
    let key = "invalid_key";
    redis::cmd("SET")
        .arg(key)
        .arg("invalid_data")
        .arg("EX")
        .arg(60)
        .query_async::<_, ()>(&mut conn)
        .await
        .unwrap();
    let limiter = RateLimiter::new(RedisClusterStore::new(conn.clone()), policy());

    assert!(!assert_err!(limiter.run(key).await).is_blocked());

    clear(&mut conn, key).await;
}
