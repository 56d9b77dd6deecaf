//! Directory-backed result store.
//!
//! One JSON file per key under a root directory; `/` in keys maps to
//! subdirectories, so `"<sha>/spans"` lands at `<root>/<sha>/spans.json`.
//! This is the local stand-in for the object-store bucket a CI deployment
//! points the driver at.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracelint_core::{ResultStore, StoreError};

#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in key.split('/') {
            path.push(part);
        }
        path.set_extension("json");
        path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResultStore for DirStore {
    fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw = match fs::read(self.path_for(key)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }
}
