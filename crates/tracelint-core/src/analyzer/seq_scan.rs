//! Sequential-scan detection over archived EXPLAIN plans.
//!
//! The plan walking is deliberately Postgres-shaped; other plan formats are
//! out of scope.

use crate::analyzer::{Analyzer, FindingSet};
use crate::finding::{Finding, FindingKind};
use crate::fingerprint::fingerprint;
use crate::forest::SpanForest;
use crate::metadata::Metadata;
use crate::trace::{Span, SpanKind};

/// Flags queries whose archived plan reads a relation front to back.
pub struct SeqScanAnalyzer<'a> {
    forest: &'a SpanForest,
    metadata: Option<&'a Metadata>,
    results: FindingSet,
}

impl<'a> SeqScanAnalyzer<'a> {
    pub fn new(forest: &'a SpanForest, metadata: Option<&'a Metadata>) -> Self {
        Self {
            forest,
            metadata,
            results: FindingSet::default(),
        }
    }
}

impl<'a> Analyzer<'a> for SeqScanAnalyzer<'a> {
    fn visit(&mut self, span: &'a Span) {
        let Some(explained) = self.metadata.and_then(|m| m.explained.as_ref()) else {
            return;
        };
        if span.kind() != SpanKind::Db {
            return;
        }
        let Some(sql) = span.sql() else { return };
        let Some(document) = explained.get(sql) else {
            return;
        };
        if !document.plan.contains_seq_scan() {
            return;
        }

        // Keyed by the statement alone so every test hitting it merges.
        let key = fingerprint(&[sql]);
        let finding = self
            .results
            .entry(&key, || Finding::new(FindingKind::SeqScan, vec![sql.to_owned()]));
        if let Some(test) = self.forest.enclosing_test(span) {
            finding.tests.insert(test);
        }
    }

    fn into_findings(self) -> Vec<Finding> {
        self.results.into_findings()
    }
}
