//! Domain types and pure logic shared by every tutorlog crate.
//!
//! This crate has no internal dependencies and performs no I/O so that the
//! store, event fanout, concurrency services and socket handlers can all
//! reference the same record model, error taxonomy, lock constants and
//! merge policy.

pub mod autofill;
pub mod channels;
pub mod error;
pub mod locking;
pub mod merge;
pub mod notifications;
pub mod profile;
pub mod records;
pub mod roles;
pub mod types;
