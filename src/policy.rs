use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::error::PolicyError;

/// Limits applied to every key handled by a limiter.
///
/// `attempts` calls are allowed inside a window of `window_seconds`. The call
/// after that is rejected and blocks the key for `cooldown_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RateLimitPolicy {
    pub attempts: u32,
    #[validate(range(min = 1))]
    pub window_seconds: u64,
    #[validate(range(min = 1))]
    pub cooldown_seconds: u64,
}

impl RateLimitPolicy {
    /// Create a validated policy
    pub fn new(
        attempts: u32,
        window_seconds: u64,
        cooldown_seconds: u64,
    ) -> Result<Self, PolicyError> {
        let policy = Self {
            attempts,
            window_seconds,
            cooldown_seconds,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}
