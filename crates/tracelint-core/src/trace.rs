//! Span records, classification, and test identity.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TraceError;

/// Attribute carrying the SQL text of a database span.
pub const ATTR_DB_STATEMENT: &str = "db.statement";
/// Attribute carrying the logical database name of a database span.
pub const ATTR_DB_NAME: &str = "db.name";
/// Attribute carrying the source file of the test a span ran under.
pub const ATTR_TEST_PATH: &str = "test.path";
/// Attribute carrying the source line of the test a span ran under.
pub const ATTR_TEST_LINE: &str = "test.line";
/// Attribute carrying the name of the test a span ran under.
pub const ATTR_TEST_NAME: &str = "test.name";

/// One span record as exported by the trace collector.
///
/// This is the wire shape; [`Span`] is the parsed, validated form.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpanRecord {
    pub name: String,
    pub context: SpanContext,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    pub start_time: String,
    pub end_time: String,
}

/// Trace coordinates of a span record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
}

/// Derived classification of a span. Never stored, always recomputed from
/// the attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// The span executed a database statement (`db.statement` present).
    Db,
    /// The span marks the test a subtree ran under (`test.name` present).
    Test,
    Other,
}

/// A parsed, immutable trace span.
///
/// Identity is `(name, trace_id, span_id, parent_id)`; records collapsing
/// to the same identity are deduplicated during forest construction.
#[derive(Debug, Clone)]
pub struct Span {
    pub name: String,
    pub trace_id: String,
    pub span_id: String,
    pub parent_id: Option<String>,
    pub attributes: BTreeMap<String, Value>,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
}

impl Span {
    pub(crate) fn from_record(record: SpanRecord) -> Result<Self, TraceError> {
        let span_id = record.context.span_id;
        let start_time = parse_timestamp(&record.start_time, &span_id, "start_time")?;
        let end_time = parse_timestamp(&record.end_time, &span_id, "end_time")?;
        Ok(Self {
            name: record.name,
            trace_id: record.context.trace_id,
            span_id,
            parent_id: record.parent_id,
            attributes: record.attributes,
            start_time,
            end_time,
        })
    }

    pub fn kind(&self) -> SpanKind {
        if self.attributes.contains_key(ATTR_DB_STATEMENT) {
            SpanKind::Db
        } else if self.attributes.contains_key(ATTR_TEST_NAME) {
            SpanKind::Test
        } else {
            SpanKind::Other
        }
    }

    /// SQL text of a database span. `None` for non-DB spans and for
    /// `db.statement` values that are not strings.
    pub fn sql(&self) -> Option<&str> {
        self.attributes.get(ATTR_DB_STATEMENT)?.as_str()
    }

    /// Identity of the test this span marks. Requires all three `test.*`
    /// attributes to be present and well-typed.
    pub fn test(&self) -> Option<Test> {
        let path = self.attributes.get(ATTR_TEST_PATH)?.as_str()?;
        let line = self.attributes.get(ATTR_TEST_LINE)?.as_u64()?;
        let name = self.attributes.get(ATTR_TEST_NAME)?.as_str()?;
        Some(Test {
            path: path.to_owned(),
            line,
            name: name.to_owned(),
        })
    }

    /// True for database spans recording a top-level SELECT.
    pub fn is_select(&self) -> bool {
        self.kind() == SpanKind::Db && self.name == "SELECT"
    }

    pub(crate) fn identity(&self) -> (&str, &str, &str, Option<&str>) {
        (
            &self.name,
            &self.trace_id,
            &self.span_id,
            self.parent_id.as_deref(),
        )
    }
}

/// Identity of one test case.
///
/// Totally ordered by `(path, line, name)`, which the derive produces from
/// the field order.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct Test {
    pub path: String,
    pub line: u64,
    pub name: String,
}

fn parse_timestamp(
    raw: &str,
    span_id: &str,
    field: &'static str,
) -> Result<DateTime<FixedOffset>, TraceError> {
    DateTime::parse_from_rfc3339(raw).or_else(|err| {
        // Some exporters omit the offset; those timestamps are taken as UTC.
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc().fixed_offset())
            .map_err(|_| TraceError::InvalidTimestamp {
                span_id: span_id.to_owned(),
                field,
                source: err,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(attributes: Value) -> SpanRecord {
        serde_json::from_value(json!({
            "name": "SELECT",
            "context": {"trace_id": "t", "span_id": "s"},
            "parent_id": null,
            "attributes": attributes,
            "start_time": "2024-05-01T12:00:00+00:00",
            "end_time": "2024-05-01T12:00:01+00:00",
        }))
        .expect("valid record")
    }

    #[test]
    fn classifies_db_spans() {
        let span = Span::from_record(record(json!({"db.statement": "SELECT 1"}))).unwrap();
        assert_eq!(span.kind(), SpanKind::Db);
        assert_eq!(span.sql(), Some("SELECT 1"));
        assert!(span.test().is_none());
    }

    #[test]
    fn classifies_test_spans() {
        let span = Span::from_record(record(json!({
            "test.path": "tests/test_demo.py",
            "test.line": 17,
            "test.name": "test_listing",
        })))
        .unwrap();
        assert_eq!(span.kind(), SpanKind::Test);
        assert_eq!(
            span.test(),
            Some(Test {
                path: "tests/test_demo.py".into(),
                line: 17,
                name: "test_listing".into(),
            })
        );
    }

    #[test]
    fn db_wins_over_test_when_both_attributes_present() {
        let span = Span::from_record(record(json!({
            "db.statement": "SELECT 1",
            "test.name": "test_listing",
        })))
        .unwrap();
        assert_eq!(span.kind(), SpanKind::Db);
    }

    #[test]
    fn classifies_other_spans() {
        let span = Span::from_record(record(json!({"http.method": "GET"}))).unwrap();
        assert_eq!(span.kind(), SpanKind::Other);
        assert!(span.sql().is_none());
    }

    #[test]
    fn non_string_statement_yields_no_sql() {
        let span = Span::from_record(record(json!({"db.statement": 42}))).unwrap();
        assert_eq!(span.kind(), SpanKind::Db);
        assert!(span.sql().is_none());
    }

    #[test]
    fn incomplete_test_attributes_yield_no_test() {
        let span = Span::from_record(record(json!({"test.name": "test_listing"}))).unwrap();
        assert_eq!(span.kind(), SpanKind::Test);
        assert!(span.test().is_none());
    }

    #[test]
    fn timestamps_keep_sub_microsecond_precision() {
        let mut raw = record(json!({}));
        raw.start_time = "2024-05-01T12:00:00.123456789+00:00".into();
        let span = Span::from_record(raw).unwrap();
        assert_eq!(span.start_time.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn offsetless_timestamps_are_taken_as_utc() {
        let mut raw = record(json!({}));
        raw.start_time = "2024-05-01T12:00:00.000001".into();
        let span = Span::from_record(raw).unwrap();
        assert_eq!(span.start_time.offset().local_minus_utc(), 0);
        assert_eq!(span.start_time.timestamp_subsec_nanos(), 1_000);
    }

    #[test]
    fn garbage_timestamp_is_an_input_parse_error() {
        let mut raw = record(json!({}));
        raw.end_time = "yesterday-ish".into();
        let err = Span::from_record(raw).unwrap_err();
        assert!(matches!(
            err,
            TraceError::InvalidTimestamp { field: "end_time", .. }
        ));
    }

    #[test]
    fn test_identity_orders_by_path_then_line_then_name() {
        let a = Test { path: "a.py".into(), line: 9, name: "z".into() };
        let b = Test { path: "a.py".into(), line: 10, name: "a".into() };
        let c = Test { path: "b.py".into(), line: 1, name: "a".into() };
        assert!(a < b);
        assert!(b < c);
    }
}
