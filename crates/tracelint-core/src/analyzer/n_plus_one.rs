//! N+1 detection: a source SELECT followed by a homogeneous burst of
//! sibling SELECTs under the same parent.

use crate::analyzer::{Analyzer, FindingSet};
use crate::finding::{Finding, FindingKind};
use crate::fingerprint::fingerprint;
use crate::forest::SpanForest;
use crate::trace::Span;

/// Minimum number of repeated siblings before a burst counts as N+1.
///
/// Two repeats means three SELECTs under one parent in total. Lower drowns
/// the signal in noise; higher misses small fanouts.
pub const N_PLUS_ONE_REPEAT_THRESHOLD: usize = 2;

/// Detects the lazy-loading pattern: one source query, then N repetitions
/// of a second query varying only by parameters.
///
/// The source and the repeats must be siblings under one parent span, which
/// keeps unrelated sequential queries and cross-test noise out, and the
/// repeats must be textually identical to each other.
pub struct NPlusOneAnalyzer<'a> {
    forest: &'a SpanForest,
    source_span: Option<&'a Span>,
    source_sql: Option<String>,
    n_spans: Vec<&'a Span>,
    n_sql: Option<String>,
    results: FindingSet,
}

impl<'a> NPlusOneAnalyzer<'a> {
    pub fn new(forest: &'a SpanForest) -> Self {
        Self {
            forest,
            source_span: None,
            source_sql: None,
            n_spans: Vec::new(),
            n_sql: None,
            results: FindingSet::default(),
        }
    }

    /// Saves the current run if it qualifies, then restarts detection with
    /// `span` as the new candidate source.
    fn reset(&mut self, span: &'a Span) {
        self.save_if_qualifying();
        self.source_sql = span.sql().map(str::to_owned);
        self.source_span = Some(span);
        self.n_spans.clear();
        self.n_sql = None;
    }

    fn save_if_qualifying(&mut self) {
        if self.n_spans.len() < N_PLUS_ONE_REPEAT_THRESHOLD {
            return;
        }
        let (Some(source_span), Some(source_sql), Some(n_sql)) = (
            self.source_span,
            self.source_sql.as_deref(),
            self.n_sql.as_deref(),
        ) else {
            return;
        };

        let key = fingerprint(&[source_sql, n_sql]);
        let finding = self.results.entry(&key, || {
            Finding::new(
                FindingKind::NPlusOne,
                vec![source_sql.to_owned(), n_sql.to_owned()],
            )
        });
        if let Some(test) = self.forest.enclosing_test(source_span) {
            finding.tests.insert(test);
        }
    }
}

impl<'a> Analyzer<'a> for NPlusOneAnalyzer<'a> {
    fn visit(&mut self, span: &'a Span) {
        if !span.is_select() || span.parent_id.is_none() {
            return;
        }
        let Some(sql) = span.sql() else { return };

        let Some(source_span) = self.source_span else {
            // Maybe this span is the source that triggers a burst.
            self.reset(span);
            return;
        };

        if span.parent_id != source_span.parent_id {
            // New parent, restart detection under it.
            self.reset(span);
        } else if Some(sql) == self.source_sql.as_deref() {
            // Identical consecutive siblings collapse to a new source; they
            // are not an N+1 of themselves.
            self.reset(span);
        } else if self.n_sql.as_deref().map_or(true, |n_sql| n_sql == sql) {
            self.n_sql = Some(sql.to_owned());
            self.n_spans.push(span);
        } else {
            // A third distinct sibling breaks the run.
            self.reset(span);
        }
    }

    fn finish(&mut self) {
        self.save_if_qualifying();
    }

    fn into_findings(self) -> Vec<Finding> {
        self.results.into_findings()
    }
}
