//! In-process mutual exclusion keyed by resource id.
//!
//! A [`Lock`] is live while its age is below the timeout. Expired locks are
//! treated as absent by [`LockService::acquire`] and are deleted by the
//! background sweep. [`LockService::with_lock`] retries with a fixed delay
//! and releases through a [`LockGuard`], so the lock is freed on every exit
//! path: normal return, error return, panic, or the future being dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tutorlog_core::error::CoreError;

use crate::config::LockConfig;

/// A held lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub resource_id: String,
    pub acquired_at: Instant,
    /// Identifies the acquisition, so a guard only ever releases its own lock.
    pub holder_token: String,
    /// Timeout the lock was acquired with; used by the sweep.
    pub timeout: Duration,
}

impl Lock {
    fn is_live_at(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.acquired_at) < timeout
    }
}

struct Inner {
    locks: Mutex<HashMap<String, Lock>>,
    config: LockConfig,
}

/// Lock table plus retry policy. Cheap to clone; clones share the table.
#[derive(Clone)]
pub struct LockService {
    inner: Arc<Inner>,
}

impl LockService {
    pub fn new(config: LockConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                locks: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.inner.config
    }

    /// Try once to take the lock for `resource_id`.
    ///
    /// Returns `true` and records a new lock when no live lock exists
    /// (an expired one is replaced). Never blocks.
    pub fn acquire(&self, resource_id: &str, timeout: Duration) -> bool {
        self.try_acquire(resource_id, timeout).is_some()
    }

    /// Check-and-set under the table mutex; returns the holder token on success.
    fn try_acquire(&self, resource_id: &str, timeout: Duration) -> Option<String> {
        let now = Instant::now();
        let mut locks = self.inner.locks.lock();

        if let Some(existing) = locks.get(resource_id) {
            if existing.is_live_at(now, timeout) {
                return None;
            }
            tracing::debug!(resource_id, "Replacing stale lock");
        }

        let holder_token = uuid::Uuid::new_v4().to_string();
        locks.insert(
            resource_id.to_string(),
            Lock {
                resource_id: resource_id.to_string(),
                acquired_at: now,
                holder_token: holder_token.clone(),
                timeout,
            },
        );
        Some(holder_token)
    }

    /// Remove the lock for `resource_id` unconditionally. Idempotent.
    pub fn release(&self, resource_id: &str) {
        self.inner.locks.lock().remove(resource_id);
    }

    /// Remove the lock only if it is still the acquisition identified by `token`.
    fn release_if_held(&self, resource_id: &str, token: &str) -> bool {
        let mut locks = self.inner.locks.lock();
        match locks.get(resource_id) {
            Some(lock) if lock.holder_token == token => {
                locks.remove(resource_id);
                true
            }
            _ => false,
        }
    }

    /// Whether a live lock exists for `resource_id`, judged by its own timeout.
    pub fn is_locked(&self, resource_id: &str) -> bool {
        let now = Instant::now();
        self.inner
            .locks
            .lock()
            .get(resource_id)
            .is_some_and(|lock| lock.is_live_at(now, lock.timeout))
    }

    /// Number of lock entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete every lock whose age has reached its timeout.
    ///
    /// Returns the number of locks removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut locks = self.inner.locks.lock();
        let before = locks.len();
        locks.retain(|_, lock| lock.is_live_at(now, lock.timeout));
        before - locks.len()
    }

    /// Acquire with the configured timeout, retrying with fixed delay.
    pub async fn lock(&self, resource_id: &str) -> Result<LockGuard, CoreError> {
        self.lock_with_timeout(resource_id, self.inner.config.timeout)
            .await
    }

    /// Acquire with an explicit lock timeout, retrying with fixed delay.
    ///
    /// Makes at most `max_retries` attempts, sleeping `retry_delay` between
    /// them, then fails with [`CoreError::LockTimeout`].
    pub async fn lock_with_timeout(
        &self,
        resource_id: &str,
        timeout: Duration,
    ) -> Result<LockGuard, CoreError> {
        let attempts = self.inner.config.max_retries.max(1);

        for attempt in 1..=attempts {
            if let Some(holder_token) = self.try_acquire(resource_id, timeout) {
                if attempt > 1 {
                    tracing::debug!(resource_id, attempt, "Lock acquired after retry");
                }
                return Ok(LockGuard {
                    service: self.clone(),
                    resource_id: resource_id.to_string(),
                    holder_token,
                    released: false,
                });
            }
            if attempt < attempts {
                tokio::time::sleep(self.inner.config.retry_delay).await;
            }
        }

        tracing::warn!(resource_id, attempts, "Lock acquisition timed out");
        Err(CoreError::LockTimeout {
            resource_id: resource_id.to_string(),
            attempts,
        })
    }

    /// Run `f` while holding the lock for `resource_id`.
    ///
    /// The lock is released before this returns, whatever `f` returns.
    pub async fn with_lock<F, Fut, T, E>(&self, resource_id: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CoreError>,
    {
        self.with_lock_timeout(resource_id, self.inner.config.timeout, f)
            .await
    }

    /// [`with_lock`](Self::with_lock) with an explicit lock timeout.
    pub async fn with_lock_timeout<F, Fut, T, E>(
        &self,
        resource_id: &str,
        timeout: Duration,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CoreError>,
    {
        let guard = self.lock_with_timeout(resource_id, timeout).await?;
        let result = f().await;
        guard.release();
        result
    }
}

impl Default for LockService {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}

/// Releases its lock when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    service: LockService,
    resource_id: String,
    holder_token: String,
    released: bool,
}

impl LockGuard {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Release now instead of at drop.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if !self
            .service
            .release_if_held(&self.resource_id, &self.holder_token)
        {
            tracing::debug!(
                resource_id = %self.resource_id,
                "Lock expired or was taken over before release"
            );
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;

    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(5_000);

    fn fast_service() -> LockService {
        LockService::new(LockConfig {
            timeout: TIMEOUT,
            max_retries: 10,
            retry_delay: Duration::from_millis(100),
            sweep_interval: Duration::from_secs(10),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn second_acquire_fails_until_release() {
        let locks = fast_service();
        assert!(locks.acquire("record:update:r1", TIMEOUT));
        assert!(!locks.acquire("record:update:r1", TIMEOUT));
        assert!(locks.is_locked("record:update:r1"));

        locks.release("record:update:r1");
        assert!(!locks.is_locked("record:update:r1"));
        assert!(locks.acquire("record:update:r1", TIMEOUT));
    }

    #[tokio::test(start_paused = true)]
    async fn release_of_absent_lock_is_noop() {
        let locks = fast_service();
        locks.release("nothing");
        locks.release("nothing");
        assert!(locks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn different_resources_do_not_contend() {
        let locks = fast_service();
        assert!(locks.acquire("record:update:r1", TIMEOUT));
        assert!(locks.acquire("record:update:r2", TIMEOUT));
        assert!(locks.acquire("record:delete:r1", TIMEOUT));
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_lock_is_treated_as_absent() {
        let locks = fast_service();
        assert!(locks.acquire("r", TIMEOUT));

        tokio::time::advance(TIMEOUT - Duration::from_millis(1)).await;
        assert!(!locks.acquire("r", TIMEOUT));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(locks.acquire("r", TIMEOUT));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired_locks() {
        let locks = fast_service();
        assert!(locks.acquire("old", TIMEOUT));
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(locks.acquire("young", TIMEOUT));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(locks.sweep_expired(), 1);
        assert_eq!(locks.len(), 1);
        assert!(locks.is_locked("young"));
    }

    #[tokio::test(start_paused = true)]
    async fn with_lock_releases_after_success() {
        let locks = fast_service();
        let value: Result<u32, CoreError> = locks.with_lock("r", || async { Ok(7) }).await;
        assert_eq!(value.unwrap(), 7);
        assert!(locks.acquire("r", TIMEOUT));
    }

    #[tokio::test(start_paused = true)]
    async fn with_lock_releases_after_error() {
        let locks = fast_service();
        let result: Result<(), CoreError> = locks
            .with_lock("r", || async { Err(CoreError::Validation("boom".into())) })
            .await;
        assert_matches!(result, Err(CoreError::Validation(_)));
        assert!(locks.acquire("r", TIMEOUT));
    }

    #[tokio::test(start_paused = true)]
    async fn with_lock_times_out_after_retry_budget() {
        let locks = fast_service();
        assert!(locks.acquire("r", TIMEOUT));

        let started = Instant::now();
        let result: Result<(), CoreError> = locks.with_lock("r", || async { Ok(()) }).await;

        assert_matches!(
            result,
            Err(CoreError::LockTimeout { ref resource_id, attempts: 10 }) if resource_id == "r"
        );
        let waited = started.elapsed();
        let max_wait = locks.config().max_wait();
        assert!(waited >= max_wait && waited < max_wait + Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn with_lock_waits_for_release() {
        let locks = fast_service();
        assert!(locks.acquire("r", TIMEOUT));

        let releaser = locks.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            releaser.release("r");
        });

        let started = Instant::now();
        let result: Result<(), CoreError> = locks.with_lock("r", || async { Ok(()) }).await;
        assert!(result.is_ok());
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(250) && waited < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_future_releases_lock() {
        let locks = fast_service();
        let inner = locks.clone();
        let handle = tokio::spawn(async move {
            let _: Result<(), CoreError> = inner
                .with_lock("r", || async {
                    std::future::pending::<()>().await;
                    Ok(())
                })
                .await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(locks.is_locked("r"));

        handle.abort();
        let _ = handle.await;
        assert!(!locks.is_locked("r"));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_guard_does_not_release_successor() {
        let locks = fast_service();
        let guard = locks.lock("r").await.unwrap();

        tokio::time::advance(TIMEOUT).await;
        assert!(locks.acquire("r", TIMEOUT));

        drop(guard);
        assert!(locks.is_locked("r"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn bodies_never_overlap() {
        let locks = LockService::new(LockConfig {
            max_retries: 1_000,
            retry_delay: Duration::from_millis(1),
            ..LockConfig::default()
        });
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let locks = locks.clone();
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    locks
                        .with_lock("shared", || async {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            tokio::time::sleep(Duration::from_millis(2)).await;
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, CoreError>(())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
