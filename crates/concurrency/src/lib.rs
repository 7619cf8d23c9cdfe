//! Concurrency control for tutorlog writes.
//!
//! - [`LockService`]: short-lived mutual exclusion keyed by resource id,
//!   with bounded fixed-delay retry and stale-lock expiry.
//! - [`sweep`]: background task deleting abandoned locks.
//! - [`VersionedStore`]: optimistic concurrency for single-owner documents,
//!   with a version counter and the conflict-merge policy.
//! - [`ChangeFeed`] / [`DocumentView`]: cross-session propagation of
//!   document changes, reconciled by version.
//! - [`WriteCoordinator`]: serialized record create/update/delete with
//!   notification persistence and curator fanout.
//!
//! Every service is an explicitly constructed instance; nothing here is a
//! process-wide global.

pub mod config;
pub mod coordinator;
pub mod document;
pub mod lock;
pub mod sweep;
pub mod sync;

pub use config::LockConfig;
pub use coordinator::WriteCoordinator;
pub use document::{VersionedDocument, VersionedStore, WriteOutcome};
pub use lock::{Lock, LockGuard, LockService};
pub use sync::{ChangeFeed, DocumentChanged, DocumentView};
