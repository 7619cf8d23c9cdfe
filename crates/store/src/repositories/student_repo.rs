//! Repository for the `students` reference document.

use tutorlog_core::autofill::{find_autofill, AutofillHint, Student};

use crate::{keys, read_or_default, write_json, KeyValueStore, StoreError};

pub struct StudentRepo;

impl StudentRepo {
    pub fn list(store: &dyn KeyValueStore) -> Result<Vec<Student>, StoreError> {
        read_or_default(store, keys::STUDENTS)
    }

    pub fn replace_all(store: &dyn KeyValueStore, students: &[Student]) -> Result<(), StoreError> {
        write_json(store, keys::STUDENTS, &students)
    }

    /// Look up autofill data for a typed student name.
    pub fn autofill(store: &dyn KeyValueStore, name: &str) -> Result<Option<AutofillHint>, StoreError> {
        Ok(find_autofill(&Self::list(store)?, name))
    }
}
