//! Analyzers: stateful single-pass visitors over the ordered span stream.
//!
//! Each analyzer is stepped once per span in forest order, flushed with
//! [`Analyzer::finish`], and drained. Analyzer state is private to a single
//! run; findings accumulate in an insertion-ordered map keyed by an in-run
//! identity so repeated evidence merges instead of duplicating.

mod missing_index;
mod n_plus_one;
mod seq_scan;

pub use missing_index::MissingIndexAnalyzer;
pub use n_plus_one::{NPlusOneAnalyzer, N_PLUS_ONE_REPEAT_THRESHOLD};
pub use seq_scan::SeqScanAnalyzer;

use tracing::debug;

use crate::finding::Finding;
use crate::forest::SpanForest;
use crate::metadata::Metadata;
use crate::trace::Span;

/// A single-pass detector fed each span in forest order.
pub trait Analyzer<'a> {
    /// Steps the analyzer with the next span.
    fn visit(&mut self, span: &'a Span);

    /// Flushes any state still held at the end of the stream.
    fn finish(&mut self) {}

    /// Drains accumulated findings, in first-detection order.
    fn into_findings(self) -> Vec<Finding>
    where
        Self: Sized;
}

/// Runs every analyzer over the forest and concatenates their findings.
///
/// Analyzers run in a fixed declared order and are not deduplicated across
/// each other: identical SQL can legitimately surface under two kinds, with
/// distinct fingerprints because the kind participates in the hash.
pub fn analyze(forest: &SpanForest, metadata: Option<&Metadata>) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(run(NPlusOneAnalyzer::new(forest), forest));
    findings.extend(run(MissingIndexAnalyzer::new(forest, metadata), forest));
    findings.extend(run(SeqScanAnalyzer::new(forest, metadata), forest));
    debug!(
        spans = forest.len(),
        findings = findings.len(),
        "analysis complete"
    );
    findings
}

fn run<'a, A: Analyzer<'a>>(mut analyzer: A, forest: &'a SpanForest) -> Vec<Finding> {
    for span in forest.iter() {
        analyzer.visit(span);
    }
    analyzer.finish();
    analyzer.into_findings()
}

/// Findings keyed by an in-run identity, preserving first-insertion order.
#[derive(Debug, Default)]
pub(crate) struct FindingSet {
    entries: Vec<(String, Finding)>,
}

impl FindingSet {
    /// Returns the finding stored under `key`, inserting `make()` first if
    /// absent.
    pub(crate) fn entry(&mut self, key: &str, make: impl FnOnce() -> Finding) -> &mut Finding {
        let pos = match self.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => pos,
            None => {
                self.entries.push((key.to_owned(), make()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Finding> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, finding)| finding)
    }

    pub(crate) fn into_findings(self) -> Vec<Finding> {
        self.entries
            .into_iter()
            .map(|(_, finding)| finding)
            .collect()
    }
}
