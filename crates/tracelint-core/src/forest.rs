//! The span forest: id-indexed spans with deterministic traversal order.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::error::TraceError;
use crate::trace::{Span, SpanKind, SpanRecord, Test};

/// A set of spans indexed by id.
///
/// Iteration order is ascending `start_time` with ties broken by `span_id`,
/// so a forest built from the same records always walks the same way.
/// Construction validates that every non-null `parent_id` resolves and that
/// parent chains are acyclic, which makes [`SpanForest::ancestors`]
/// infallible afterwards.
#[derive(Debug, Clone)]
pub struct SpanForest {
    spans: Vec<Span>,
    by_id: HashMap<String, usize>,
    order: Vec<usize>,
}

impl SpanForest {
    /// Builds a forest from decoded span records.
    ///
    /// Records with identical `(name, trace_id, span_id, parent_id)`
    /// identity collapse to one span.
    pub fn from_records(records: Vec<SpanRecord>) -> Result<Self, TraceError> {
        let mut spans: Vec<Span> = Vec::with_capacity(records.len());
        let mut seen = HashSet::new();
        for record in records {
            let span = Span::from_record(record)?;
            let identity = {
                let (name, trace_id, span_id, parent_id) = span.identity();
                (
                    name.to_owned(),
                    trace_id.to_owned(),
                    span_id.to_owned(),
                    parent_id.map(str::to_owned),
                )
            };
            if seen.insert(identity) {
                spans.push(span);
            }
        }

        let mut by_id = HashMap::with_capacity(spans.len());
        for (idx, span) in spans.iter().enumerate() {
            by_id.entry(span.span_id.clone()).or_insert(idx);
        }

        for span in &spans {
            if let Some(parent_id) = &span.parent_id {
                if !by_id.contains_key(parent_id) {
                    return Err(TraceError::UnknownParent {
                        span_id: span.span_id.clone(),
                        parent_id: parent_id.clone(),
                    });
                }
            }
        }

        let mut order: Vec<usize> = (0..spans.len()).collect();
        order.sort_by(|&a, &b| {
            let (left, right) = (&spans[a], &spans[b]);
            left.start_time
                .cmp(&right.start_time)
                .then_with(|| left.span_id.cmp(&right.span_id))
        });

        let forest = Self { spans, by_id, order };
        forest.check_acyclic()?;
        debug!(spans = forest.len(), "built span forest");
        Ok(forest)
    }

    /// Builds a forest straight from a JSON array of span records.
    pub fn parse(data: &Value) -> Result<Self, TraceError> {
        let records: Vec<SpanRecord> = serde_json::from_value(data.clone())?;
        Self::from_records(records)
    }

    fn check_acyclic(&self) -> Result<(), TraceError> {
        for span in &self.spans {
            let mut hops = 0usize;
            let mut current = span;
            while let Some(parent) = self.parent(current) {
                hops += 1;
                if hops > self.spans.len() {
                    return Err(TraceError::ParentCycle {
                        span_id: span.span_id.clone(),
                    });
                }
                current = parent;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans in ascending `start_time` order, ties broken by `span_id`.
    pub fn iter(&self) -> impl Iterator<Item = &Span> {
        self.order.iter().map(move |&idx| &self.spans[idx])
    }

    pub fn get(&self, span_id: &str) -> Option<&Span> {
        self.by_id.get(span_id).map(|&idx| &self.spans[idx])
    }

    /// The parent of `span`, or `None` for roots.
    pub fn parent(&self, span: &Span) -> Option<&Span> {
        self.get(span.parent_id.as_deref()?)
    }

    /// The ancestor chain of `span`, from immediate parent up to its root.
    pub fn ancestors<'a>(&'a self, span: &'a Span) -> Ancestors<'a> {
        Ancestors {
            forest: self,
            current: self.parent(span),
        }
    }

    /// The test marked by the nearest TEST ancestor of `span`, if any.
    pub fn enclosing_test(&self, span: &Span) -> Option<Test> {
        self.ancestors(span)
            .find(|ancestor| ancestor.kind() == SpanKind::Test)
            .and_then(Span::test)
    }
}

/// Iterator over the ancestor chain of a span, child-first.
pub struct Ancestors<'a> {
    forest: &'a SpanForest,
    current: Option<&'a Span>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Span;

    fn next(&mut self) -> Option<Self::Item> {
        let span = self.current?;
        self.current = self.forest.parent(span);
        Some(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn span(id: &str, parent: Option<&str>, start: &str) -> Value {
        json!({
            "name": format!("span-{id}"),
            "context": {"trace_id": "trace-1", "span_id": id},
            "parent_id": parent,
            "attributes": {},
            "start_time": start,
            "end_time": start,
        })
    }

    fn forest(spans: Vec<Value>) -> Result<SpanForest, TraceError> {
        SpanForest::parse(&Value::Array(spans))
    }

    #[test]
    fn iterates_in_start_time_order_with_span_id_tiebreak() {
        let built = forest(vec![
            span("c", None, "2024-05-01T12:00:02+00:00"),
            span("b", None, "2024-05-01T12:00:01+00:00"),
            span("a", None, "2024-05-01T12:00:01+00:00"),
        ])
        .unwrap();
        let ids: Vec<&str> = built.iter().map(|s| s.span_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn offset_aware_ordering_compares_instants() {
        // 13:00+01:00 is the same instant as 12:00Z; the +02:00 span is earlier.
        let built = forest(vec![
            span("x", None, "2024-05-01T13:00:00+01:00"),
            span("y", None, "2024-05-01T13:00:00+02:00"),
        ])
        .unwrap();
        let ids: Vec<&str> = built.iter().map(|s| s.span_id.as_str()).collect();
        assert_eq!(ids, ["y", "x"]);
    }

    #[test]
    fn duplicate_records_collapse() {
        let built = forest(vec![
            span("a", None, "2024-05-01T12:00:00+00:00"),
            span("a", None, "2024-05-01T12:00:00+00:00"),
        ])
        .unwrap();
        assert_eq!(built.len(), 1);
    }

    #[test]
    fn parent_and_ancestors_walk_child_first() {
        let built = forest(vec![
            span("root", None, "2024-05-01T12:00:00+00:00"),
            span("mid", Some("root"), "2024-05-01T12:00:01+00:00"),
            span("leaf", Some("mid"), "2024-05-01T12:00:02+00:00"),
        ])
        .unwrap();
        let leaf = built.get("leaf").unwrap();
        assert_eq!(built.parent(leaf).unwrap().span_id, "mid");
        let chain: Vec<&str> = built.ancestors(leaf).map(|s| s.span_id.as_str()).collect();
        assert_eq!(chain, ["mid", "root"]);
        let root = built.get("root").unwrap();
        assert_eq!(built.ancestors(root).count(), 0);
    }

    #[test]
    fn unresolvable_parent_is_fatal() {
        let err = forest(vec![span("a", Some("ghost"), "2024-05-01T12:00:00+00:00")]).unwrap_err();
        assert!(matches!(err, TraceError::UnknownParent { .. }));
    }

    #[test]
    fn parent_cycle_is_fatal() {
        let err = forest(vec![
            span("a", Some("b"), "2024-05-01T12:00:00+00:00"),
            span("b", Some("a"), "2024-05-01T12:00:01+00:00"),
        ])
        .unwrap_err();
        assert!(matches!(err, TraceError::ParentCycle { .. }));
    }

    #[test]
    fn enclosing_test_finds_nearest_test_ancestor() {
        let test_attrs = json!({
            "test.path": "tests/test_demo.py",
            "test.line": 17,
            "test.name": "test_listing",
        });
        let mut test_span = span("t", None, "2024-05-01T12:00:00+00:00");
        test_span["attributes"] = test_attrs;
        test_span["name"] = json!("test");
        let built = forest(vec![
            test_span,
            span("mid", Some("t"), "2024-05-01T12:00:01+00:00"),
            span("leaf", Some("mid"), "2024-05-01T12:00:02+00:00"),
        ])
        .unwrap();
        let leaf = built.get("leaf").unwrap();
        let test = built.enclosing_test(leaf).unwrap();
        assert_eq!(test.name, "test_listing");
        // A span is not its own ancestor.
        let t = built.get("t").unwrap();
        assert!(built.enclosing_test(t).is_none());
    }

    #[test]
    fn malformed_record_is_fatal() {
        let err = SpanForest::parse(&json!([{"name": "incomplete"}])).unwrap_err();
        assert!(matches!(err, TraceError::MalformedRecord(_)));
    }
}
