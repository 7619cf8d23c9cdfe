//! Typed repositories over the collection documents.
//!
//! Each repository is a zero-sized struct with associated functions taking
//! the store, mirroring one document key. Mutations go through
//! [`modify`](crate::modify) so writers holding different resource locks
//! cannot lose each other's changes to the shared collection.

pub mod notification_repo;
pub mod record_repo;
pub mod student_repo;

pub use notification_repo::NotificationRepo;
pub use record_repo::RecordRepo;
pub use student_repo::StudentRepo;
