//! Attempt counting with a fixed cooldown.
//!
//! Each key moves through `unseen -> counting -> cooldown -> unseen`. The
//! counter lives only in the [`CounterStore`]; this type keeps no per-key state,
//! so any number of processes can share one store.
//!
//! `run` reads the counter and then writes it in a separate step. Two callers
//! racing on the same key can both act on the same reading, so the limit may
//! be overshot by a few calls near the threshold. This is an approximate guard,
//! not an exact quota.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{LimiterError, Result, StoreError};
use crate::policy::RateLimitPolicy;
use crate::store::CounterStore;

/// Store mutation chosen for a counter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Key is absent or expired: start a new window.
    Initialize,
    /// Still under the limit: count the call.
    Increment,
    /// This call crosses the limit: count it, start the cooldown, reject it.
    ArmCooldown,
    /// Already cooling down: reject without touching the store.
    Blocked,
}

impl Transition {
    pub fn for_count(value: i64, attempts: u32) -> Self {
        let attempts = i64::from(attempts);
        if value == 0 {
            Transition::Initialize
        } else if value < attempts {
            Transition::Increment
        } else if value == attempts {
            Transition::ArmCooldown
        } else {
            Transition::Blocked
        }
    }

    pub fn is_allowed(self) -> bool {
        matches!(self, Transition::Initialize | Transition::Increment)
    }
}

/// Object-safe view of a limiter, independent of the store behind it.
#[async_trait]
pub trait Limiter: Send + Sync {
    /// Count one attempt for `key`, failing with [`LimiterError::Blocked`] once
    /// the limit is reached.
    async fn run(&self, key: &str) -> Result<()>;

    /// Whether `key` is past its limit. Store failures report `false`.
    async fn rate_limit_exceeded(&self, key: &str) -> bool;

    /// Forget everything recorded for `key`.
    async fn reset(&self, key: &str) -> Result<()>;

    /// Check that the backing store answers.
    async fn ping(&self) -> Result<(), StoreError>;

    fn policy(&self) -> &RateLimitPolicy;
}

#[derive(Debug, Clone)]
pub struct RateLimiter<S> {
    store: S,
    policy: RateLimitPolicy,
    store_timeout: Option<Duration>,
}

impl<S: CounterStore> RateLimiter<S> {
    pub fn new(store: S, policy: RateLimitPolicy) -> Self {
        Self {
            store,
            policy,
            store_timeout: None,
        }
    }

    /// Bound every store call by `timeout`; an elapsed call fails with
    /// [`StoreError::Timeout`].
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn run(&self, key: &str) -> Result<()> {
        let value = self.guarded(self.store.read(key)).await?;
        let transition = Transition::for_count(value, self.policy.attempts);
        debug!(value, ?transition, "counter read");

        match transition {
            Transition::Initialize => {
                self.guarded(self.store.initialize(key, self.policy.window()))
                    .await?;
            }
            Transition::Increment => {
                self.guarded(self.store.increment(key)).await?;
            }
            Transition::ArmCooldown => {
                self.guarded(self.store.arm_cooldown(key, self.policy.cooldown()))
                    .await?;
                warn!(
                    cooldown_seconds = self.policy.cooldown_seconds,
                    "attempt limit reached, cooldown started"
                );
            }
            Transition::Blocked => {}
        }

        if transition.is_allowed() {
            Ok(())
        } else {
            Err(LimiterError::Blocked)
        }
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn rate_limit_exceeded(&self, key: &str) -> bool {
        match self.guarded(self.store.read(key)).await {
            Ok(value) => value > i64::from(self.policy.attempts),
            Err(e) => {
                warn!(error = %e, "counter read failed, reporting limit as not exceeded");
                false
            }
        }
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn reset(&self, key: &str) -> Result<()> {
        self.guarded(self.store.remove(key)).await?;
        debug!("counter removed");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.guarded(self.store.ping()).await
    }

    async fn guarded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| StoreError::Timeout(limit))?,
            None => call.await,
        }
    }
}

#[async_trait]
impl<S: CounterStore> Limiter for RateLimiter<S> {
    async fn run(&self, key: &str) -> Result<()> {
        RateLimiter::run(self, key).await
    }

    async fn rate_limit_exceeded(&self, key: &str) -> bool {
        RateLimiter::rate_limit_exceeded(self, key).await
    }

    async fn reset(&self, key: &str) -> Result<()> {
        RateLimiter::reset(self, key).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        RateLimiter::ping(self).await
    }

    fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    /// Store whose every call fails, counting the writes it was asked for.
    #[derive(Default)]
    struct UnreachableStore {
        writes: AtomicUsize,
    }

    impl UnreachableStore {
        fn refused() -> StoreError {
            StoreError::Internal("connection refused".to_string())
        }
    }

    #[async_trait]
    impl CounterStore for UnreachableStore {
        async fn initialize(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(Self::refused())
        }

        async fn increment(&self, _key: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(Self::refused())
        }

        async fn arm_cooldown(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(Self::refused())
        }

        async fn read(&self, _key: &str) -> Result<i64, StoreError> {
            Err(Self::refused())
        }

        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(Self::refused())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(Self::refused())
        }
    }

    /// Store that never answers.
    struct StalledStore;

    #[async_trait]
    impl CounterStore for StalledStore {
        async fn initialize(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn increment(&self, _key: &str) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn arm_cooldown(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn read(&self, _key: &str) -> Result<i64, StoreError> {
            std::future::pending().await
        }

        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            std::future::pending().await
        }
    }

    fn policy() -> RateLimitPolicy {
        RateLimitPolicy::new(3, 15, 60).unwrap()
    }

    #[test]
    fn test_transition_for_count() {
        assert_eq!(Transition::for_count(0, 3), Transition::Initialize);
        assert_eq!(Transition::for_count(1, 3), Transition::Increment);
        assert_eq!(Transition::for_count(2, 3), Transition::Increment);
        assert_eq!(Transition::for_count(3, 3), Transition::ArmCooldown);
        assert_eq!(Transition::for_count(4, 3), Transition::Blocked);
        assert_eq!(Transition::for_count(400, 3), Transition::Blocked);
    }

    #[test]
    fn test_transition_with_zero_attempts() {
        assert_eq!(Transition::for_count(0, 0), Transition::Initialize);
        assert_eq!(Transition::for_count(1, 0), Transition::Blocked);
    }

    #[test]
    fn test_only_counting_transitions_are_allowed() {
        assert!(Transition::Initialize.is_allowed());
        assert!(Transition::Increment.is_allowed());
        assert!(!Transition::ArmCooldown.is_allowed());
        assert!(!Transition::Blocked.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_outcome_follows_transition() {
        let limiter = RateLimiter::new(MemoryStore::new(), policy());

        for _ in 0..6 {
            let before = limiter.store().read("foo").await.unwrap();
            let transition = Transition::for_count(before, 3);
            assert_eq!(limiter.run("foo").await.is_ok(), transition.is_allowed());
        }
    }

    #[tokio::test]
    async fn test_run_propagates_read_failure_without_writing() {
        let store = Arc::new(UnreachableStore::default());
        let limiter = RateLimiter::new(store.clone(), policy());

        let err = assert_err!(limiter.run("foo").await);
        assert!(!err.is_blocked());
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exceeded_fails_open_on_store_error() {
        let limiter = RateLimiter::new(UnreachableStore::default(), policy());
        assert!(!limiter.rate_limit_exceeded("foo").await);
    }

    #[tokio::test]
    async fn test_reset_propagates_store_error() {
        let limiter = RateLimiter::new(UnreachableStore::default(), policy());
        assert_err!(limiter.reset("foo").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_surfaces_as_store_error() {
        let limiter = RateLimiter::new(StalledStore, policy())
            .with_store_timeout(Duration::from_millis(100));

        match limiter.run("foo").await {
            Err(LimiterError::Store(StoreError::Timeout(limit))) => {
                assert_eq!(limit, Duration::from_millis(100));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(!limiter.rate_limit_exceeded("foo").await);
        assert_err!(limiter.reset("foo").await);
    }

    #[tokio::test]
    async fn test_limiter_trait_object_delegates() {
        let limiter: Arc<dyn Limiter> =
            Arc::new(RateLimiter::new(MemoryStore::new(), policy()));

        assert_ok!(limiter.run("foo").await);
        assert!(!limiter.rate_limit_exceeded("foo").await);
        assert_ok!(limiter.ping().await);
        assert_eq!(limiter.policy().attempts, 3);
        assert_ok!(limiter.reset("foo").await);
    }
}
