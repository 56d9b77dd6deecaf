//! Error types for trace analysis.
//!
//! # Error Handling Strategy
//!
//! Failures fall into two camps, and the split drives the whole design:
//!
//! - Fatal errors ([`TraceError`], [`StoreError`], [`CompareError`]): a
//!   malformed span record, an unresolvable parent id, or a broken store
//!   invalidates the entire run and propagates to the driver with `?`.
//!
//! - Best-effort misses ([`SqlError`]): analyzers are signals, not proofs.
//!   A statement the SQL parser cannot handle makes that one span contribute
//!   nothing; it must never sink the run.

use thiserror::Error;

/// Fatal error raised while ingesting span records or building the forest.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A span record did not match the expected schema; the serde error
    /// names the offending field.
    #[error("malformed span record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    /// A timestamp field could not be parsed as ISO-8601.
    #[error("span `{span_id}`: unparseable `{field}` timestamp")]
    InvalidTimestamp {
        span_id: String,
        field: &'static str,
        #[source]
        source: chrono::ParseError,
    },

    /// A span references a parent id with no span in the forest.
    #[error("span `{span_id}` references unknown parent `{parent_id}`")]
    UnknownParent { span_id: String, parent_id: String },

    /// Following parent links from a span revisits an earlier span.
    #[error("parent chain starting at span `{span_id}` forms a cycle")]
    ParentCycle { span_id: String },
}

/// SQL parse failure inside WHERE-clause extraction.
#[derive(Debug, Error)]
#[error("unparseable SQL: {0}")]
pub struct SqlError(#[from] pub sqlparser::parser::ParserError);

/// Failure inside a result-store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("result store i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("result store payload: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Error raised while comparing two archived analysis runs.
#[derive(Debug, Error)]
pub enum CompareError {
    /// No archived span data for the base commit. The driver usually turns
    /// this into a "no baseline yet" signal rather than a hard failure.
    #[error("no archived analysis data for base commit {0}")]
    MissingBase(String),

    /// No archived span data for the head commit.
    #[error("no archived analysis data for head commit {0}")]
    MissingHead(String),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Archived metadata was present but failed to decode.
    #[error("malformed archived metadata: {0}")]
    MalformedMetadata(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_base_names_the_sha() {
        let err = CompareError::MissingBase("abc123".into());
        assert_eq!(
            err.to_string(),
            "no archived analysis data for base commit abc123"
        );
    }

    #[test]
    fn unknown_parent_names_both_spans() {
        let err = TraceError::UnknownParent {
            span_id: "child".into(),
            parent_id: "ghost".into(),
        };
        assert_eq!(
            err.to_string(),
            "span `child` references unknown parent `ghost`"
        );
    }

    #[test]
    fn trace_error_is_a_compare_error() {
        let err = CompareError::from(TraceError::ParentCycle {
            span_id: "a".into(),
        });
        assert!(matches!(err, CompareError::Trace(_)));
    }
}
