//! Optional per-run metadata: archived EXPLAIN plans and the index catalog.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::Index;

/// Plan node type Postgres reports for a full relation read.
pub const SEQ_SCAN_NODE: &str = "Seq Scan";

/// Side-channel metadata archived next to span data.
///
/// Both sections are independently optional. Analyzers that need an absent
/// section become no-ops; in particular an absent `indexes` catalog means
/// "unknown", not "no indexes exist".
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    /// SQL text → EXPLAIN plan document, keyed by the statement as captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explained: Option<BTreeMap<String, ExplainPlan>>,
    /// The index catalog enumerated from the schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<Index>>,
}

/// A Postgres `EXPLAIN (FORMAT JSON)` document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExplainPlan {
    #[serde(rename = "Plan")]
    pub plan: PlanNode,
}

/// One node of a plan tree.
///
/// Only the node type and the children are read; everything else Postgres
/// emits is ignored, and unknown node types are walked through rather than
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlanNode {
    #[serde(rename = "Node Type", default)]
    pub node_type: String,
    #[serde(rename = "Plans", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// True if this node or any descendant is a sequential scan.
    pub fn contains_seq_scan(&self) -> bool {
        self.node_type == SEQ_SCAN_NODE || self.children.iter().any(PlanNode::contains_seq_scan)
    }
}
