//! Comparing two analysis runs: only what the head side introduces.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::analyzer::analyze;
use crate::error::CompareError;
use crate::finding::Finding;
use crate::forest::SpanForest;
use crate::metadata::Metadata;
use crate::storage::ResultStore;

/// Store key for the archived span data of a commit.
pub fn spans_key(sha: &str) -> String {
    format!("{sha}/spans")
}

/// Store key for the archived metadata of a commit.
pub fn metadata_key(sha: &str) -> String {
    format!("{sha}/metadata")
}

/// Findings whose fingerprint appears only in `head`, in head order.
///
/// Identity is the fingerprint alone: new witnesses (tests, extra evidence)
/// for an already-known finding are deliberately suppressed, so flaky test
/// evidence does not re-notify.
pub fn new_findings(base: &[Finding], head: Vec<Finding>) -> Vec<Finding> {
    let known: HashSet<String> = base.iter().map(Finding::fingerprint).collect();
    head.into_iter()
        .filter(|finding| !known.contains(&finding.fingerprint()))
        .collect()
}

#[derive(Clone, Copy)]
enum Side {
    Base,
    Head,
}

/// A `(base, head)` comparison rehydrated from a result store.
///
/// Each side is read from `"<sha>/spans"` and `"<sha>/metadata"`. Head span
/// data already in hand (fresh from the current run) can be supplied with
/// [`Comparison::with_head_spans`] to bypass the store fetch. Absent span
/// data is a [`CompareError::MissingBase`] / [`CompareError::MissingHead`];
/// absent metadata is benign and simply disables the analyzers needing it.
pub struct Comparison<'a, S: ResultStore> {
    store: &'a S,
    base_sha: String,
    head_sha: String,
    head_spans: Option<Value>,
}

impl<'a, S: ResultStore> Comparison<'a, S> {
    pub fn new(store: &'a S, base_sha: impl Into<String>, head_sha: impl Into<String>) -> Self {
        Self {
            store,
            base_sha: base_sha.into(),
            head_sha: head_sha.into(),
            head_spans: None,
        }
    }

    /// Supplies head span data already in hand, bypassing the store fetch.
    pub fn with_head_spans(mut self, data: Value) -> Self {
        self.head_spans = Some(data);
        self
    }

    /// Findings introduced by the head commit.
    pub fn new_findings(&self) -> Result<Vec<Finding>, CompareError> {
        let base = self.side_findings(Side::Base)?;
        let head = self.side_findings(Side::Head)?;
        debug!(
            base = base.len(),
            head = head.len(),
            "comparing analysis runs"
        );
        Ok(new_findings(&base, head))
    }

    fn side_findings(&self, side: Side) -> Result<Vec<Finding>, CompareError> {
        let sha = match side {
            Side::Base => &self.base_sha,
            Side::Head => &self.head_sha,
        };
        let fresh = match side {
            Side::Base => None,
            Side::Head => self.head_spans.clone(),
        };
        let spans = match fresh {
            Some(data) => data,
            None => self
                .store
                .get(&spans_key(sha))?
                .ok_or_else(|| match side {
                    Side::Base => CompareError::MissingBase(sha.clone()),
                    Side::Head => CompareError::MissingHead(sha.clone()),
                })?,
        };
        let forest = SpanForest::parse(&spans)?;
        let metadata = self
            .store
            .get(&metadata_key(sha))?
            .map(serde_json::from_value::<Metadata>)
            .transpose()
            .map_err(CompareError::MalformedMetadata)?;
        Ok(analyze(&forest, metadata.as_ref()))
    }
}
