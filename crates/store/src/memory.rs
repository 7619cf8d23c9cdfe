use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

use crate::{KeyValueStore, StoreError, UpdateFn};

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.docs.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.docs.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.docs.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.docs.lock().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        let mut docs = self.docs.lock();
        if let Some(next) = f(docs.get(key).cloned())? {
            docs.insert(key.to_string(), next);
        }
        Ok(())
    }
}
