//! Property tests for the universal invariants: fingerprint stability,
//! forest ordering, comparator set-difference, and the index prefix rule.

use proptest::prelude::*;
use serde_json::{json, Value};
use sha1::{Digest, Sha1};
use tracelint_core::{fingerprint, new_findings, Finding, FindingKind, Index, SpanForest};

fn item() -> impl Strategy<Value = String> {
    "[a-z0-9%$ -]{0,16}"
}

proptest! {
    /// The fingerprint equals an independently recomputed double-SHA1
    /// construction for any ordered tuple.
    #[test]
    fn fingerprint_matches_independent_construction(items in prop::collection::vec(item(), 1..5)) {
        let expected = {
            let digests: Vec<String> = items
                .iter()
                .map(|item| {
                    let mut hasher = Sha1::new();
                    hasher.update(item.as_bytes());
                    hex::encode(hasher.finalize())
                })
                .collect();
            let mut outer = Sha1::new();
            outer.update(digests.join("-").as_bytes());
            hex::encode(outer.finalize())
        };
        prop_assert_eq!(fingerprint(&items), expected);
    }

    /// Reordering a tuple with at least two distinct items changes the
    /// fingerprint.
    #[test]
    fn fingerprint_is_order_sensitive(items in prop::collection::vec(item(), 2..5)) {
        let mut reversed: Vec<String> = items.clone();
        reversed.reverse();
        prop_assume!(reversed != items);
        prop_assert_ne!(fingerprint(&items), fingerprint(&reversed));
    }

    /// Forest iteration is non-decreasing in start time, with the span id
    /// breaking ties.
    #[test]
    fn forest_iteration_is_totally_ordered(
        seconds in prop::collection::vec(0u32..5, 1..20),
    ) {
        let spans: Vec<Value> = seconds
            .iter()
            .enumerate()
            .map(|(i, s)| {
                json!({
                    "name": "span",
                    "context": {"trace_id": "trace-1", "span_id": format!("s{i:03}")},
                    "parent_id": null,
                    "attributes": {},
                    "start_time": format!("2024-05-01T12:00:{s:02}+00:00"),
                    "end_time": format!("2024-05-01T12:00:{s:02}+00:00"),
                })
            })
            .collect();
        let forest = SpanForest::parse(&Value::Array(spans)).expect("valid span data");

        let walked: Vec<_> = forest.iter().collect();
        for pair in walked.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!((a.start_time, &a.span_id) <= (b.start_time, &b.span_id));
        }
    }

    /// `new_findings` is exactly the fingerprint set-difference, preserving
    /// head order.
    #[test]
    fn comparator_is_a_set_difference(
        base_sqls in prop::collection::vec(0usize..8, 0..6),
        head_sqls in prop::collection::vec(0usize..8, 0..6),
    ) {
        let make = |i: &usize| Finding::new(FindingKind::SeqScan, vec![format!("SELECT {i}")]);
        let base: Vec<Finding> = base_sqls.iter().map(make).collect();
        let head: Vec<Finding> = head_sqls.iter().map(make).collect();

        let known: Vec<String> = base.iter().map(Finding::fingerprint).collect();
        let expected: Vec<Finding> = head
            .iter()
            .filter(|f| !known.contains(&f.fingerprint()))
            .cloned()
            .collect();

        prop_assert_eq!(new_findings(&base, head), expected);
    }

    /// An index covers exactly the leading prefixes of its column list.
    #[test]
    fn index_covers_exactly_its_leading_prefixes(
        columns in prop::collection::vec("[a-d]", 1..5),
        take in 0usize..6,
    ) {
        let index = Index {
            schema_name: "public".into(),
            table_name: "t".into(),
            index_name: "t_idx".into(),
            columns: columns.clone(),
        };

        let candidate: Vec<String> = columns.iter().take(take.min(columns.len())).cloned().collect();
        prop_assert!(index.covers(&candidate));

        // Anything longer than the index is never covered.
        let mut overlong = columns.clone();
        overlong.push("z".into());
        prop_assert!(!index.covers(&overlong));

        // A reversed prefix of two distinct columns is not covered.
        if columns.len() >= 2 && columns[0] != columns[1] {
            let swapped = vec![columns[1].clone(), columns[0].clone()];
            prop_assert!(!index.covers(&swapped));
        }
    }

    /// Placeholder rewriting numbers every occurrence left to right.
    #[test]
    fn placeholder_numbering_is_sequential(parts in prop::collection::vec("[a-z ]{0,8}", 1..8)) {
        let sql = parts.join("%s");
        let rewritten = tracelint_core::sql::number_placeholders(&sql);

        prop_assert!(!rewritten.contains("%s"));
        let mut rest = rewritten.as_str();
        for (k, part) in parts.iter().enumerate() {
            prop_assert!(rest.starts_with(part.as_str()));
            rest = &rest[part.len()..];
            if k + 1 < parts.len() {
                let marker = format!("${}", k + 1);
                prop_assert!(rest.starts_with(&marker));
                rest = &rest[marker.len()..];
            }
        }
        prop_assert!(rest.is_empty());
    }
}
