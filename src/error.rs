//! Error types for the limiter and its counter stores.

use std::time::Duration;
use thiserror::Error;

/// Failure talking to, or reading from, the backing counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The Redis client or server reported a failure.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A value was present at the key but could not be parsed as a counter.
    #[error("value at {key:?} is not an integer: {value:?}")]
    NotAnInteger { key: String, value: String },

    /// The store call did not complete before the configured deadline.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("internal store error: {0}")]
    Internal(String),
}

/// Error returned by limiter operations.
#[derive(Debug, Error)]
pub enum LimiterError {
    /// The key is in its blocked phase; the caller should try again later.
    #[error("rate limit: blocked")]
    Blocked,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coarse classification of a [`LimiterError`], comparable by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Blocked,
    Store,
}

impl LimiterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LimiterError::Blocked => ErrorKind::Blocked,
            LimiterError::Store(_) => ErrorKind::Store,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.kind() == ErrorKind::Blocked
    }
}

/// Rejected policy parameters.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid rate limit policy: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

pub type Result<T, E = LimiterError> = std::result::Result<T, E>;
