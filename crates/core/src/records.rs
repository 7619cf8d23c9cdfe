//! Session records: creation payload, patch semantics and list filtering.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::Session;
use crate::types::{new_entity_id, EntityId, Timestamp, UserId};

/// Entity name used in [`CoreError::NotFound`].
pub const ENTITY_RECORD: &str = "record";

/// A logged tutoring session.
///
/// `id`, `owner_id`, `owner_name` and `created_at` are identity fields and
/// are never touched by [`RecordPatch::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: EntityId,
    pub owner_id: UserId,
    pub owner_name: String,
    pub date: String,
    pub time: String,
    pub group: String,
    pub mentor: String,
    pub student: String,
    pub theme: String,
    pub status: String,
    pub created_at: Timestamp,
}

impl Record {
    /// Build a new record owned by `owner` from an already validated payload.
    pub fn create(owner: &Session, payload: NewRecord, now: Timestamp) -> Self {
        Self {
            id: new_entity_id(),
            owner_id: owner.user_id.clone(),
            owner_name: owner.name.clone(),
            date: payload.date,
            time: payload.time,
            group: payload.group,
            mentor: payload.mentor,
            student: payload.student.trim().to_string(),
            theme: payload.theme,
            status: payload.status,
            created_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

// ---------------------------------------------------------------------------
// Creation payload
// ---------------------------------------------------------------------------

/// Inbound payload for `submit`. Every field is required and must be non-blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRecord {
    pub date: String,
    pub time: String,
    pub group: String,
    pub mentor: String,
    pub student: String,
    pub theme: String,
    pub status: String,
}

impl NewRecord {
    /// Check that every required field is present and non-blank.
    ///
    /// The error message lists all offending fields in declaration order.
    pub fn validate(&self) -> Result<(), CoreError> {
        let fields = [
            ("date", &self.date),
            ("time", &self.time),
            ("group", &self.group),
            ("mentor", &self.mentor),
            ("student", &self.student),
            ("theme", &self.theme),
            ("status", &self.status),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "All fields are required; missing: {}",
                missing.join(", ")
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Shallow field replacement for `update`.
///
/// Only domain fields can be patched; identity fields sent by a client are
/// ignored during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordPatch {
    pub date: Option<String>,
    pub time: Option<String>,
    pub group: Option<String>,
    pub mentor: Option<String>,
    pub student: Option<String>,
    pub theme: Option<String>,
    pub status: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.time.is_none()
            && self.group.is_none()
            && self.mentor.is_none()
            && self.student.is_none()
            && self.theme.is_none()
            && self.status.is_none()
    }

    /// Replace every field present in the patch.
    pub fn apply(&self, record: &mut Record) {
        fn replace(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                target.clone_from(v);
            }
        }

        replace(&mut record.date, &self.date);
        replace(&mut record.time, &self.time);
        replace(&mut record.group, &self.group);
        replace(&mut record.mentor, &self.mentor);
        replace(&mut record.student, &self.student);
        replace(&mut record.theme, &self.theme);
        replace(&mut record.status, &self.status);
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Read-side filter for listing records. All criteria are conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    pub owner_id: Option<UserId>,
    pub date: Option<String>,
    pub group: Option<String>,
    /// Case-insensitive substring over student, mentor, theme and group.
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(owner) = &self.owner_id {
            if &record.owner_id != owner {
                return false;
            }
        }
        if let Some(date) = &self.date {
            if &record.date != date {
                return false;
            }
        }
        if let Some(group) = &self.group {
            if &record.group != group {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let haystack = format!(
                "{}{}{}{}",
                record.student, record.mentor, record.theme, record.group
            )
            .to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Apply `filter` and sort newest first.
pub fn filter_records(records: Vec<Record>, filter: &RecordFilter) -> Vec<Record> {
    let mut out: Vec<Record> = records.into_iter().filter(|r| filter.matches(r)).collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}
