//! Command drivers wiring the core pipeline to files and the store.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use tracelint_core::{analyze, comparison, Comparison, Finding, Metadata, ResultStore, SpanForest};

use crate::cli::OutputFormat;
use crate::input::load_json;
use crate::store::DirStore;

/// Analyzes one run of span data. Always exits clean; the findings are
/// informational until a comparison says they are new.
pub fn run_analyze(
    spans: &Path,
    metadata: Option<&Path>,
    format: OutputFormat,
) -> Result<bool> {
    let data = load_json(spans)?;
    let forest = SpanForest::parse(&data).context("failed to parse span data")?;
    let metadata = load_metadata(metadata)?;
    let findings = analyze(&forest, metadata.as_ref());
    print!("{}", format_findings(&findings, format));
    Ok(false)
}

/// Archives span data (and optional metadata) for `sha` so later runs can
/// compare against it.
pub fn run_archive(
    spans: &Path,
    metadata: Option<&Path>,
    store_dir: &Path,
    sha: &str,
) -> Result<bool> {
    let store = DirStore::new(store_dir);
    let data = load_json(spans)?;
    // Validate before archiving so a broken trace export fails loudly here
    // instead of at the next comparison.
    SpanForest::parse(&data).context("failed to parse span data")?;
    store
        .put(&comparison::spans_key(sha), &data)
        .context("failed to archive span data")?;

    if let Some(path) = metadata {
        let value = load_json(path)?;
        serde_json::from_value::<Metadata>(value.clone()).context("invalid metadata")?;
        store
            .put(&comparison::metadata_key(sha), &value)
            .context("failed to archive metadata")?;
    }
    info!(sha, store = %store.root().display(), "archived analysis data");
    Ok(false)
}

/// Compares two archived commits; exits non-zero when the head introduces
/// findings the base did not have.
pub fn run_compare(
    store_dir: &Path,
    base: &str,
    head: &str,
    head_spans: Option<&Path>,
    format: OutputFormat,
) -> Result<bool> {
    let store = DirStore::new(store_dir);
    let mut comparison = Comparison::new(&store, base, head);
    if let Some(path) = head_spans {
        comparison = comparison.with_head_spans(load_json(path)?);
    }
    let findings = comparison.new_findings().context("comparison failed")?;

    let out = match format {
        OutputFormat::Markdown => tracelint_report::render_comparison(&findings, head, base),
        OutputFormat::Json => format_json(&findings),
    };
    print!("{out}");
    Ok(!findings.is_empty())
}

fn load_metadata(path: Option<&Path>) -> Result<Option<Metadata>> {
    match path {
        Some(path) => {
            let value = load_json(path)?;
            let metadata = serde_json::from_value(value)
                .with_context(|| format!("invalid metadata in {}", path.display()))?;
            Ok(Some(metadata))
        }
        None => Ok(None),
    }
}

fn format_findings(findings: &[Finding], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(findings),
        OutputFormat::Markdown => {
            if findings.is_empty() {
                "No issues detected!\n".to_string()
            } else {
                tracelint_report::render_findings(findings)
            }
        }
    }
}

fn format_json(findings: &[Finding]) -> String {
    let mut out =
        serde_json::to_string_pretty(findings).expect("findings serialization cannot fail");
    out.push('\n');
    out
}
