//! Key-value document storage for tutorlog.
//!
//! Every component reads and writes named JSON documents through the
//! [`KeyValueStore`] contract:
//!
//! - [`MemoryStore`]: process-local map, used by tests and ephemeral runs.
//! - [`JsonFileStore`]: one pretty-printed JSON file per key under a data
//!   directory, written atomically via temp file + rename.
//! - [`repositories`]: typed access to the `records`, `notifications` and
//!   `students` collections.
//!
//! An absent key is never an error; typed readers fall back to the
//! document's `Default`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub mod error;
pub mod file;
pub mod keys;
pub mod memory;
pub mod repositories;
pub mod seed;

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Callback used by [`KeyValueStore::update`].
///
/// Receives the current document (`None` when absent) and returns the
/// replacement, or `None` to leave the stored document untouched.
pub type UpdateFn<'a> = dyn FnMut(Option<Value>) -> Result<Option<Value>, StoreError> + 'a;

/// Synchronous get/set access to named JSON documents.
///
/// Implementations serialize individual calls internally. `update` is the
/// only way to read-modify-write a document atomically.
pub trait KeyValueStore: Send + Sync {
    /// Fetch a document. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replace a document.
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Delete a document. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All keys currently present.
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Atomically replace a document with the result of `f`.
    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<(), StoreError>;
}

/// Shared handle to a store, as held by services.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Read a typed document, falling back to `T::default()` when absent.
pub fn read_or_default<T>(store: &dyn KeyValueStore, key: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match store.get(key)? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}

/// Serialize and write a typed document.
pub fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, doc: &T) -> Result<(), StoreError> {
    store.set(key, serde_json::to_value(doc)?)
}

/// Atomically read-modify-write a typed document.
///
/// `f` mutates the document in place. When it returns `Err` the stored
/// document is left untouched and the error is returned as-is.
pub fn modify<T, R, E, F>(store: &dyn KeyValueStore, key: &str, f: F) -> Result<R, E>
where
    T: Serialize + DeserializeOwned + Default,
    E: From<StoreError>,
    F: FnOnce(&mut T) -> Result<R, E>,
{
    let mut f = Some(f);
    let mut outcome: Option<Result<R, E>> = None;

    store.update(key, &mut |current| {
        let mut doc: T = match current {
            Some(value) => serde_json::from_value(value)?,
            None => T::default(),
        };
        let Some(f) = f.take() else {
            return Err(StoreError::Internal(format!(
                "update callback for '{key}' invoked twice"
            )));
        };
        match f(&mut doc) {
            Ok(r) => {
                outcome = Some(Ok(r));
                Ok(Some(serde_json::to_value(&doc)?))
            }
            Err(e) => {
                outcome = Some(Err(e));
                Ok(None)
            }
        }
    })?;

    match outcome {
        Some(result) => result,
        None => Err(StoreError::Internal(format!("update callback for '{key}' never ran")).into()),
    }
}

/// Verify the store is reachable.
pub fn health_check(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store.keys().map(|_| ())
}
