//! Findings: detected antipatterns with evidence and a stable identity.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fingerprint::fingerprint;
use crate::trace::Test;

/// The antipattern a finding reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    NPlusOne,
    SeqScan,
    MissingIndex,
}

impl FindingKind {
    /// Stable label used in fingerprints and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NPlusOne => "N_PLUS_ONE",
            Self::SeqScan => "SEQ_SCAN",
            Self::MissingIndex => "MISSING_INDEX",
        }
    }
}

/// One detected antipattern with its evidence.
///
/// `queries` has a fixed length and meaning per kind: N+1 carries the
/// source statement and the repeated statement, the other kinds carry the
/// single offending statement. `tests` is the set of test cases observed
/// triggering the pattern; additional evidence for the same `(kind,
/// queries)` merges into it rather than producing a second finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Finding {
    pub kind: FindingKind,
    pub queries: Vec<String>,
    #[serde(default)]
    pub tests: BTreeSet<Test>,
    /// Kind-specific evidence; for missing indexes, table → predicate
    /// columns.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Vec<String>>,
}

impl Finding {
    pub fn new(kind: FindingKind, queries: Vec<String>) -> Self {
        Self {
            kind,
            queries,
            tests: BTreeSet::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Stable cross-run identity: the kind label and the query texts,
    /// double-hashed.
    ///
    /// Two findings are "the same issue" iff their fingerprints match;
    /// `tests` and `extra` are witnesses, not identity.
    pub fn fingerprint(&self) -> String {
        let mut items: Vec<&str> = Vec::with_capacity(self.queries.len() + 1);
        items.push(self.kind.as_str());
        items.extend(self.queries.iter().map(String::as_str));
        fingerprint(&items)
    }
}
