//! Input file loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Reads one JSON document from `path`.
pub fn load_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_json_documents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("spans.json");
        fs::write(&path, "[1, 2]").expect("write file");
        assert_eq!(load_json(&path).unwrap(), serde_json::json!([1, 2]));
    }

    #[test]
    fn missing_file_errors_with_the_path() {
        let err = load_json(Path::new("/nonexistent/spans.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/spans.json"));
    }

    #[test]
    fn invalid_json_errors_with_the_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").expect("write file");
        let err = load_json(&path).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }
}
