//! The index catalog and the leading-prefix coverage rule.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One database index over an ordered column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Index {
    pub schema_name: String,
    pub table_name: String,
    pub index_name: String,
    pub columns: Vec<String>,
}

impl Index {
    /// True iff `columns` is exactly a leading prefix of this index.
    ///
    /// B-tree lookups only use the leading keys, so subsets, permutations
    /// and gapped matches do not count as coverage. Erring on the side of
    /// "not covered" over-reports missing indexes, which is the acceptable
    /// direction.
    pub fn covers(&self, columns: &[String]) -> bool {
        columns.len() <= self.columns.len() && self.columns[..columns.len()] == *columns
    }
}
