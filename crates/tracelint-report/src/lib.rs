//! Markdown rendering of findings for pull-request comments.
//!
//! The output is consumed by a comment-upsert collaborator: the report ends
//! with a hidden [`COMMENT_MARKER`] so a later run can find and edit its own
//! comment instead of posting a new one.

use std::collections::BTreeSet;
use std::fmt::Write;

use tracelint_core::{Finding, FindingKind, Test};

/// Hidden marker the comment-upsert collaborator searches for.
pub const COMMENT_MARKER: &str = "<!--- comment made by tracelint --->";

/// Renders a full comparison report: a header naming the compared commits,
/// the finding sections (or the all-clear line), and the attribution footer
/// with the upsert marker.
pub fn render_comparison(findings: &[Finding], head_sha: &str, base_sha: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Database regression report");
    let _ = writeln!(out);
    let _ = writeln!(out, "Comparing head `{head_sha}` against base `{base_sha}`.");
    let _ = writeln!(out);
    if findings.is_empty() {
        out.push_str("No issues detected!\n\n---\n");
    } else {
        out.push_str(&render_findings(findings));
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "*Comment made by [tracelint](https://github.com/tracelint/tracelint)*"
    );
    let _ = writeln!(out);
    out.push_str(COMMENT_MARKER);
    out.push('\n');
    out
}

/// Renders the finding sections alone, grouped by kind.
pub fn render_findings(findings: &[Finding]) -> String {
    let mut out = String::new();
    for (kind, title) in [
        (FindingKind::NPlusOne, "Potential N+1 queries"),
        (FindingKind::SeqScan, "Sequential scans"),
        (FindingKind::MissingIndex, "Missing indexes"),
    ] {
        let in_kind: Vec<&Finding> = findings.iter().filter(|f| f.kind == kind).collect();
        if in_kind.is_empty() {
            continue;
        }
        let _ = writeln!(out, "### {title}");
        let _ = writeln!(out);
        for finding in in_kind {
            render_finding(&mut out, finding);
            out.push_str("---\n");
        }
    }
    out
}

fn render_finding(out: &mut String, finding: &Finding) {
    match finding.kind {
        FindingKind::NPlusOne => {
            if let [source, repeated] = finding.queries.as_slice() {
                out.push_str("```sql\n");
                let _ = writeln!(out, "--- source query");
                let _ = writeln!(out, "{source}");
                let _ = writeln!(out, "--- repeated query");
                let _ = writeln!(out, "{repeated}");
                out.push_str("```\n");
            }
        }
        FindingKind::SeqScan | FindingKind::MissingIndex => {
            if let [sql] = finding.queries.as_slice() {
                out.push_str("```sql\n");
                let _ = writeln!(out, "{sql}");
                out.push_str("```\n");
            }
        }
    }

    if finding.kind == FindingKind::MissingIndex {
        for (table, columns) in &finding.extra {
            let listed = columns
                .iter()
                .map(|column| format!("`{column}`"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "* No index on `{table}` for columns: ({listed})");
        }
    }

    render_tests(out, &finding.tests);
}

fn render_tests(out: &mut String, tests: &BTreeSet<Test>) {
    if tests.is_empty() {
        return;
    }
    let _ = writeln!(out, "<details>");
    let _ = writeln!(out, "<summary>Executed from:</summary>");
    let _ = writeln!(out);
    for test in tests {
        let _ = writeln!(out, "* `{}::{}` (line {})", test.path, test.name, test.line);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "</details>");
}
