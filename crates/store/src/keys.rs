//! Well-known document keys.

/// All logged records (`Vec<Record>`).
pub const RECORDS: &str = "records";

/// All curator notifications (`Vec<Notification>`).
pub const NOTIFICATIONS: &str = "notifications";

/// Student reference data (`Vec<Student>`).
pub const STUDENTS: &str = "students";

/// Per-user profile documents live under `profile:<user_id>`.
pub use tutorlog_core::profile::profile_key;
