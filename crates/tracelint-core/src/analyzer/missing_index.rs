//! Missing-index detection: WHERE-clause columns with no covering index.

use tracing::trace;

use crate::analyzer::{Analyzer, FindingSet};
use crate::finding::{Finding, FindingKind};
use crate::fingerprint::fingerprint;
use crate::forest::SpanForest;
use crate::metadata::Metadata;
use crate::sql::{number_placeholders, where_columns};
use crate::trace::Span;

/// Flags SELECTs whose WHERE columns are not a leading prefix of any
/// catalogued index on the queried table.
///
/// Only spans executed under a test are considered; a query with no test
/// witness is not actionable evidence. Statements the SQL parser cannot
/// handle contribute nothing.
pub struct MissingIndexAnalyzer<'a> {
    forest: &'a SpanForest,
    metadata: Option<&'a Metadata>,
    results: FindingSet,
}

impl<'a> MissingIndexAnalyzer<'a> {
    pub fn new(forest: &'a SpanForest, metadata: Option<&'a Metadata>) -> Self {
        Self {
            forest,
            metadata,
            results: FindingSet::default(),
        }
    }
}

impl<'a> Analyzer<'a> for MissingIndexAnalyzer<'a> {
    fn visit(&mut self, span: &'a Span) {
        let Some(indexes) = self.metadata.and_then(|m| m.indexes.as_deref()) else {
            return;
        };
        if !span.is_select() {
            return;
        }
        let Some(sql) = span.sql() else { return };
        let Some(test) = self.forest.enclosing_test(span) else {
            return;
        };

        let analysis = match where_columns(&number_placeholders(sql)) {
            Ok(analysis) => analysis,
            Err(err) => {
                trace!(%err, "skipping unparseable statement");
                return;
            }
        };

        let key = fingerprint(&[sql]);
        for (table, columns) in analysis.columns_by_table() {
            let covered = indexes.iter().any(|index| {
                analysis.resolve(&index.table_name) == table.as_str() && index.covers(columns)
            });
            if !covered {
                let finding = self.results.entry(&key, || {
                    Finding::new(FindingKind::MissingIndex, vec![sql.to_owned()])
                });
                finding.extra.insert(table.clone(), columns.clone());
            }
        }
        if let Some(finding) = self.results.get_mut(&key) {
            finding.tests.insert(test);
        }
    }

    fn into_findings(self) -> Vec<Finding> {
        self.results.into_findings()
    }
}
