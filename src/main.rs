use anyhow::{Context, Result};
use clap::Parser;
use lockout::config::{Backend, Config};
use lockout::server::Server;
use lockout::{
    CounterStore, Limiter, MemoryStore, RateLimitPolicy, RateLimiter, RedisClusterStore,
    RedisStore,
};
use redis::aio::ConnectionManager;
use redis::cluster::ClusterClient;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("lockout={},tower_http=debug", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;
    let policy = config.policy()?;

    tracing::info!("Starting lockout service");
    tracing::info!(
        backend = ?config.backend,
        attempts = policy.attempts,
        window_seconds = policy.window_seconds,
        cooldown_seconds = policy.cooldown_seconds,
        "Configuration loaded"
    );

    let limiter = connect_limiter(&config, policy).await?;

    Server::new(limiter, config.bind_addr)
        .run()
        .await
        .context("server error")?;

    Ok(())
}

/// Open the configured store and wrap it in a limiter
async fn connect_limiter(config: &Config, policy: RateLimitPolicy) -> Result<Arc<dyn Limiter>> {
    let limiter = match config.backend {
        Backend::Redis => {
            let client = redis::Client::open(config.redis_url.as_str())
                .context("failed to create Redis client")?;
            let connection = ConnectionManager::new(client)
                .await
                .with_context(|| format!("failed to connect to Redis at {}", config.redis_url))?;
            tracing::info!(redis_url = %config.redis_url, "Connected to Redis");
            build(RedisStore::new(connection), policy, config)
        }
        Backend::Cluster => {
            let client = ClusterClient::new(config.cluster_nodes.clone())
                .context("failed to create Redis Cluster client")?;
            let connection = client
                .get_async_connection()
                .await
                .context("failed to connect to Redis Cluster")?;
            tracing::info!(nodes = ?config.cluster_nodes, "Connected to Redis Cluster");
            build(RedisClusterStore::new(connection), policy, config)
        }
        Backend::Memory => {
            tracing::warn!("Using in-process counters; limits are not shared between instances");
            let store = MemoryStore::new();
            spawn_sweeper(store.clone());
            build(store, policy, config)
        }
    };

    Ok(limiter)
}

fn build<S>(store: S, policy: RateLimitPolicy, config: &Config) -> Arc<dyn Limiter>
where
    S: CounterStore + 'static,
{
    let limiter = RateLimiter::new(store, policy);
    match config.store_timeout {
        Some(timeout) => Arc::new(limiter.with_store_timeout(timeout)),
        None => Arc::new(limiter),
    }
}

/// Periodically drop expired counters from the in-process store
fn spawn_sweeper(store: MemoryStore) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            match store.purge_expired() {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired counters"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired counters"),
            }
        }
    });
}
