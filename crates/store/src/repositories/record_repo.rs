//! Repository for the `records` document.

use tutorlog_core::records::{filter_records, Record, RecordFilter};

use crate::{keys, modify, read_or_default, KeyValueStore, StoreError};

/// Provides CRUD operations for records.
pub struct RecordRepo;

impl RecordRepo {
    /// All records in insertion order.
    pub fn list(store: &dyn KeyValueStore) -> Result<Vec<Record>, StoreError> {
        read_or_default(store, keys::RECORDS)
    }

    /// Records matching `filter`, newest first.
    pub fn list_filtered(
        store: &dyn KeyValueStore,
        filter: &RecordFilter,
    ) -> Result<Vec<Record>, StoreError> {
        Ok(filter_records(Self::list(store)?, filter))
    }

    pub fn find_by_id(store: &dyn KeyValueStore, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(Self::list(store)?.into_iter().find(|r| r.id == id))
    }

    /// Append a record.
    pub fn insert(store: &dyn KeyValueStore, record: &Record) -> Result<(), StoreError> {
        modify(store, keys::RECORDS, |records: &mut Vec<Record>| {
            records.push(record.clone());
            Ok(())
        })
    }

    /// Replace the stored record with the same id.
    ///
    /// Returns `false` (and writes nothing) if no such record exists.
    pub fn replace(store: &dyn KeyValueStore, record: &Record) -> Result<bool, StoreError> {
        modify(store, keys::RECORDS, |records: &mut Vec<Record>| {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(slot) => {
                    *slot = record.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    /// Remove a record by id. Returns `true` if a record was removed.
    pub fn delete(store: &dyn KeyValueStore, id: &str) -> Result<bool, StoreError> {
        modify(store, keys::RECORDS, |records: &mut Vec<Record>| {
            let before = records.len();
            records.retain(|r| r.id != id);
            Ok(records.len() != before)
        })
    }
}
