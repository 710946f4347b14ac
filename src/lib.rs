//! Distributed attempt limiting with a fixed cooldown.
//!
//! A [`RateLimiter`] allows `attempts` calls per key inside a window. The call
//! that crosses the limit is rejected and blocks the key for a cooldown; calls
//! during the cooldown are rejected without extending it. Counters live in a
//! [`CounterStore`] (Redis, Redis Cluster or in-process), so every process
//! sharing the store enforces the same limits.
//!
//! ```rust,no_run
//! use lockout::{RateLimitPolicy, RateLimiter, RedisStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = redis::Client::open("redis://127.0.0.1:6379")?;
//! let connection = redis::aio::ConnectionManager::new(client).await?;
//! let limiter = RateLimiter::new(RedisStore::new(connection), RateLimitPolicy::new(3, 15, 60)?);
//!
//! match limiter.run("login:alice").await {
//!     Ok(()) => println!("attempt allowed"),
//!     Err(e) if e.is_blocked() => println!("try again later"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod rate_limiter;
pub mod response;
pub mod server;
pub mod store;
pub mod validation;

pub use config::Config;
pub use error::{ErrorKind, LimiterError, PolicyError, Result, StoreError};
pub use policy::RateLimitPolicy;
pub use rate_limiter::{Limiter, RateLimiter, Transition};
pub use server::create_app;
pub use store::{CounterStore, MemoryStore, RedisClusterStore, RedisStore};
