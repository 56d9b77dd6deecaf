//! The result-store contract and an in-memory implementation.
//!
//! The archive behind comparisons is a plain key-value store of
//! JSON-encodable values; the production backing (an object store bucket)
//! lives with the driver. Keys are `<sha>/<section>` paths.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::StoreError;

/// Key-value archive for analysis inputs.
///
/// `get` distinguishes absence from failure: a missing key is `Ok(None)`,
/// and the comparison layer decides whether that is fatal.
pub trait ResultStore {
    fn put(&self, key: &str, value: &Value) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
}

/// Process-local store backed by a map.
///
/// The reference implementation of the contract; used by tests and by
/// drivers that only compare fresh in-memory runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemoryStore {
    fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("result store lock poisoned")
            .insert(key.to_owned(), value.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .entries
            .lock()
            .expect("result store lock poisoned")
            .get(key)
            .cloned())
    }
}
