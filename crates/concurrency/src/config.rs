use std::time::Duration;

use tutorlog_core::locking::{
    DEFAULT_LOCK_MAX_RETRIES, DEFAULT_LOCK_RETRY_DELAY_MS, DEFAULT_LOCK_TIMEOUT_MS,
    LOCK_SWEEP_INTERVAL_SECS,
};

/// Lock timing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    /// Age at which a lock is stale.
    pub timeout: Duration,
    /// Acquire attempts made by `with_lock` before failing.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Interval of the background stale-lock sweep.
    pub sweep_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            max_retries: DEFAULT_LOCK_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_LOCK_RETRY_DELAY_MS),
            sweep_interval: Duration::from_secs(LOCK_SWEEP_INTERVAL_SECS),
        }
    }
}

impl LockConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `LOCK_TIMEOUT_MS`          | `5000`  |
    /// | `LOCK_MAX_RETRIES`         | `10`    |
    /// | `LOCK_RETRY_DELAY_MS`      | `100`   |
    /// | `LOCK_SWEEP_INTERVAL_SECS` | `10`    |
    pub fn from_env() -> Self {
        let timeout_ms: u64 = std::env::var("LOCK_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_LOCK_TIMEOUT_MS.to_string())
            .parse()
            .expect("LOCK_TIMEOUT_MS must be a valid u64");

        let max_retries: u32 = std::env::var("LOCK_MAX_RETRIES")
            .unwrap_or_else(|_| DEFAULT_LOCK_MAX_RETRIES.to_string())
            .parse()
            .expect("LOCK_MAX_RETRIES must be a valid u32");

        let retry_delay_ms: u64 = std::env::var("LOCK_RETRY_DELAY_MS")
            .unwrap_or_else(|_| DEFAULT_LOCK_RETRY_DELAY_MS.to_string())
            .parse()
            .expect("LOCK_RETRY_DELAY_MS must be a valid u64");

        let sweep_interval = parse_sweep_interval(
            &std::env::var("LOCK_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| LOCK_SWEEP_INTERVAL_SECS.to_string()),
        );

        Self {
            timeout: Duration::from_millis(timeout_ms),
            max_retries,
            retry_delay: Duration::from_millis(retry_delay_ms),
            sweep_interval,
        }
    }

    /// Upper bound on how long `with_lock` waits before giving up.
    pub fn max_wait(&self) -> Duration {
        self.retry_delay * self.max_retries.saturating_sub(1)
    }
}

/// Parse `LOCK_SWEEP_INTERVAL_SECS`. Zero is rejected: the sweep needs a
/// non-zero period.
fn parse_sweep_interval(raw: &str) -> Duration {
    let secs: u64 = raw
        .parse()
        .expect("LOCK_SWEEP_INTERVAL_SECS must be a valid u64");
    assert!(secs > 0, "LOCK_SWEEP_INTERVAL_SECS must be at least 1");
    Duration::from_secs(secs)
}
