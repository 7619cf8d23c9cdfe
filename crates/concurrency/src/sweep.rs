//! Periodic deletion of abandoned locks.
//!
//! A lock whose holder never released it (a crashed task, a dropped runtime)
//! is already ignored by `acquire` once it ages past its timeout; the sweep
//! keeps the table from growing with such entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::lock::LockService;

/// Shortest period the sweep will run at.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Run the stale-lock sweep loop until `cancel` is triggered.
pub async fn run(locks: LockService, cancel: CancellationToken) {
    let period = locks.config().sweep_interval.max(MIN_INTERVAL);

    tracing::info!(interval_secs = period.as_secs(), "Lock sweep started");

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Lock sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = locks.sweep_expired();
                if removed > 0 {
                    tracing::info!(removed, remaining = locks.len(), "Lock sweep: removed stale locks");
                } else {
                    tracing::trace!("Lock sweep: nothing to remove");
                }
            }
        }
    }
}

/// Spawn [`run`] on the current runtime.
pub fn spawn(locks: LockService, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run(locks, cancel))
}
