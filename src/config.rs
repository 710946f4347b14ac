use clap::{Parser, ValueEnum};
use humantime_serde::re::humantime;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::error::PolicyError;
use crate::policy::RateLimitPolicy;

/// Which counter store the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// A single Redis endpoint
    Redis,
    /// A Redis Cluster
    Cluster,
    /// In-process counters; not shared between instances
    Memory,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Service configuration, read from flags with environment fallbacks.
#[derive(Debug, Clone, Parser)]
#[command(name = "lockout", version, about = "Distributed attempt limiter service")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "LOCKOUT_BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Counter store backend
    #[arg(long, env = "LOCKOUT_BACKEND", value_enum, default_value_t = Backend::Redis)]
    pub backend: Backend,

    /// Redis connection URL, used by the `redis` backend
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Comma separated cluster node URLs, used by the `cluster` backend
    #[arg(long, env = "REDIS_CLUSTER_NODES", value_delimiter = ',')]
    pub cluster_nodes: Vec<String>,

    /// Attempts allowed per window before the cooldown starts
    #[arg(long, env = "LOCKOUT_ATTEMPTS")]
    pub attempts: u32,

    /// Lifetime of a counting window in seconds
    #[arg(long, env = "LOCKOUT_WINDOW_SECONDS")]
    pub window_seconds: u64,

    /// Lifetime of a cooldown in seconds
    #[arg(long, env = "LOCKOUT_COOLDOWN_SECONDS")]
    pub cooldown_seconds: u64,

    /// Deadline for each store call, e.g. `250ms` or `2s`
    #[arg(long, env = "LOCKOUT_STORE_TIMEOUT", value_parser = humantime::parse_duration)]
    pub store_timeout: Option<Duration>,

    /// Log level for the service's own events
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Check the store settings for the selected backend
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            Backend::Redis => validate_redis_url(&self.redis_url),
            Backend::Cluster => {
                if self.cluster_nodes.is_empty() {
                    return Err(ConfigError::Invalid(
                        "cluster backend requires at least one node in REDIS_CLUSTER_NODES"
                            .to_string(),
                    ));
                }
                self.cluster_nodes
                    .iter()
                    .try_for_each(|node| validate_redis_url(node))
            }
            Backend::Memory => Ok(()),
        }
    }

    /// Build the validated limiter policy
    pub fn policy(&self) -> Result<RateLimitPolicy, PolicyError> {
        RateLimitPolicy::new(self.attempts, self.window_seconds, self.cooldown_seconds)
    }
}

fn validate_redis_url(url: &str) -> Result<(), ConfigError> {
    if url.is_empty() {
        return Err(ConfigError::Invalid("Redis URL cannot be empty".to_string()));
    }

    if !url.starts_with("redis://") && !url.starts_with("rediss://") {
        return Err(ConfigError::Invalid(format!(
            "Redis URL must start with 'redis://' or 'rediss://', got '{}'",
            url
        )));
    }

    Ok(())
}
