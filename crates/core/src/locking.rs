//! Lock timing constants and resource-id derivation.
//!
//! Mutual exclusion is keyed by a resource id of the form
//! `"<operation>:<target>"`. Unrelated operations on different targets never
//! contend; repeated operations on the same target serialize.

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// A lock older than this is stale and treated as released.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Number of acquire attempts `with_lock` makes before giving up.
pub const DEFAULT_LOCK_MAX_RETRIES: u32 = 10;

/// Fixed delay between acquire attempts.
pub const DEFAULT_LOCK_RETRY_DELAY_MS: u64 = 100;

/// How often the stale-lock sweep runs (in seconds).
pub const LOCK_SWEEP_INTERVAL_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Operation prefixes used to build resource ids.
pub mod operations {
    pub const RECORD_SUBMIT: &str = "record:submit";
    pub const RECORD_UPDATE: &str = "record:update";
    pub const RECORD_DELETE: &str = "record:delete";
    pub const NOTIFICATIONS_SEEN: &str = "notifications:seen";
    pub const DOCUMENT: &str = "document";
}

/// Build the resource id for `operation` on `target`.
pub fn resource_id(operation: &str, target: &str) -> String {
    format!("{operation}:{target}")
}
