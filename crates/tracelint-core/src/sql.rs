//! SQL utilities: placeholder rewriting and WHERE-clause column extraction.
//!
//! Driver-captured statements arrive with `%s` parameter placeholders, which
//! no SQL parser accepts. [`number_placeholders`] rewrites them to the
//! positional `$k` form, shared by the missing-index analyzer and by any
//! collaborator that prepares statements for EXPLAIN. [`where_columns`] then
//! parses the rewritten statement and gathers the predicate columns the
//! index matcher needs.

use std::sync::OnceLock;

use regex::Regex;
use sqlparser::ast::{
    Expr, FunctionArg, FunctionArgExpr, FunctionArguments, Query, Select, SetExpr, Statement,
    TableFactor,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::error::SqlError;

/// Rewrites driver-style `%s` placeholders to positional `$k` form.
///
/// Occurrences are numbered left to right starting at 1, so a statement
/// with `n` placeholders comes out carrying `$1` through `$n`.
pub fn number_placeholders(sql: &str) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| Regex::new(r"%s").expect("invalid placeholder pattern"));

    let mut k = 0usize;
    re.replace_all(sql, |_: &regex::Captures<'_>| {
        k += 1;
        format!("${k}")
    })
    .into_owned()
}

/// Tables and WHERE-clause columns extracted from one statement.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WhereAnalysis {
    /// `alias_or_name → table name`, one entry per table reachable from a
    /// FROM or JOIN, CTEs and subqueries included.
    aliases: Vec<(String, String)>,
    /// Resolved table → predicate columns, first-appearance order.
    columns: Vec<(String, Vec<String>)>,
}

impl WhereAnalysis {
    /// Resolves a possibly-aliased table reference to its table name.
    /// Unknown references resolve to themselves.
    pub fn resolve<'a>(&'a self, reference: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(alias, _)| alias == reference)
            .map(|(_, name)| name.as_str())
            .unwrap_or(reference)
    }

    /// WHERE-clause columns grouped by table, in first-appearance order.
    pub fn columns_by_table(&self) -> &[(String, Vec<String>)] {
        &self.columns
    }

    /// The single table the statement references, when there is exactly one.
    fn single_table(&self) -> Option<&str> {
        let mut names = self.aliases.iter().map(|(_, name)| name.as_str());
        let first = names.next()?;
        names.all(|name| name == first).then_some(first)
    }

    fn push_column(&mut self, table: String, column: String) {
        match self.columns.iter_mut().find(|(name, _)| *name == table) {
            Some((_, columns)) => {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
            None => self.columns.push((table, vec![column])),
        }
    }
}

/// Parses `sql` (Postgres dialect) and gathers WHERE-clause columns grouped
/// by resolved table.
///
/// A qualified column resolves its qualifier through the alias table. An
/// unqualified column attaches to the statement's single table when there
/// is exactly one candidate, and is skipped otherwise. Repeated mentions of
/// a column keep only the first appearance.
pub fn where_columns(sql: &str) -> Result<WhereAnalysis, SqlError> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)?;

    let mut analysis = WhereAnalysis::default();
    let mut mentions: Vec<(Option<String>, String)> = Vec::new();
    for statement in &statements {
        if let Statement::Query(query) = statement {
            collect_query(query, &mut analysis.aliases, &mut mentions);
        }
    }

    for (qualifier, column) in mentions {
        let table = match qualifier {
            Some(qualifier) => analysis.resolve(&qualifier).to_owned(),
            None => match analysis.single_table() {
                Some(table) => table.to_owned(),
                None => continue,
            },
        };
        analysis.push_column(table, column);
    }
    Ok(analysis)
}

fn collect_query(
    query: &Query,
    aliases: &mut Vec<(String, String)>,
    mentions: &mut Vec<(Option<String>, String)>,
) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            collect_query(&cte.query, aliases, mentions);
        }
    }
    collect_set_expr(&query.body, aliases, mentions);
}

fn collect_set_expr(
    body: &SetExpr,
    aliases: &mut Vec<(String, String)>,
    mentions: &mut Vec<(Option<String>, String)>,
) {
    match body {
        SetExpr::Select(select) => collect_select(select, aliases, mentions),
        SetExpr::Query(query) => collect_query(query, aliases, mentions),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr(left, aliases, mentions);
            collect_set_expr(right, aliases, mentions);
        }
        _ => {}
    }
}

fn collect_select(
    select: &Select,
    aliases: &mut Vec<(String, String)>,
    mentions: &mut Vec<(Option<String>, String)>,
) {
    for table_with_joins in &select.from {
        collect_table_factor(&table_with_joins.relation, aliases, mentions);
        for join in &table_with_joins.joins {
            collect_table_factor(&join.relation, aliases, mentions);
        }
    }
    if let Some(selection) = &select.selection {
        collect_expr(selection, aliases, mentions);
    }
}

fn collect_table_factor(
    factor: &TableFactor,
    aliases: &mut Vec<(String, String)>,
    mentions: &mut Vec<(Option<String>, String)>,
) {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            let table = object_name_tail(name);
            let key = alias
                .as_ref()
                .map(|alias| alias.name.value.clone())
                .unwrap_or_else(|| table.clone());
            if !aliases.iter().any(|(existing, _)| *existing == key) {
                aliases.push((key, table));
            }
        }
        TableFactor::Derived { subquery, .. } => collect_query(subquery, aliases, mentions),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            collect_table_factor(&table_with_joins.relation, aliases, mentions);
            for join in &table_with_joins.joins {
                collect_table_factor(&join.relation, aliases, mentions);
            }
        }
        _ => {}
    }
}

/// Trailing segment of a possibly schema-qualified name, quotes stripped.
fn object_name_tail(name: &sqlparser::ast::ObjectName) -> String {
    let full = name.to_string();
    let tail = full.rsplit('.').next().unwrap_or(full.as_str());
    tail.trim_matches('"').to_string()
}

fn collect_expr(
    expr: &Expr,
    aliases: &mut Vec<(String, String)>,
    mentions: &mut Vec<(Option<String>, String)>,
) {
    match expr {
        Expr::Identifier(ident) => mentions.push((None, ident.value.clone())),
        Expr::CompoundIdentifier(parts) => {
            if let [qualifier @ .., column] = parts.as_slice() {
                let qualifier = qualifier.last().map(|part| part.value.clone());
                mentions.push((qualifier, column.value.clone()));
            }
        }
        Expr::BinaryOp { left, right, .. }
        | Expr::AnyOp { left, right, .. }
        | Expr::AllOp { left, right, .. } => {
            collect_expr(left, aliases, mentions);
            collect_expr(right, aliases, mentions);
        }
        Expr::UnaryOp { expr, .. } | Expr::Cast { expr, .. } => {
            collect_expr(expr, aliases, mentions)
        }
        Expr::Nested(inner) | Expr::IsNull(inner) | Expr::IsNotNull(inner) => {
            collect_expr(inner, aliases, mentions)
        }
        Expr::InList { expr, list, .. } => {
            collect_expr(expr, aliases, mentions);
            for item in list {
                collect_expr(item, aliases, mentions);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            collect_expr(expr, aliases, mentions);
            collect_expr(low, aliases, mentions);
            collect_expr(high, aliases, mentions);
        }
        Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
            collect_expr(expr, aliases, mentions);
            collect_expr(pattern, aliases, mentions);
        }
        Expr::InSubquery { expr, subquery, .. } => {
            collect_expr(expr, aliases, mentions);
            collect_query(subquery, aliases, mentions);
        }
        Expr::Subquery(subquery) | Expr::Exists { subquery, .. } => {
            collect_query(subquery, aliases, mentions)
        }
        Expr::Function(func) => {
            if let FunctionArguments::List(arg_list) = &func.args {
                for arg in &arg_list.args {
                    if let FunctionArg::Unnamed(FunctionArgExpr::Expr(expr))
                    | FunctionArg::Named {
                        arg: FunctionArgExpr::Expr(expr),
                        ..
                    } = arg
                    {
                        collect_expr(expr, aliases, mentions);
                    }
                }
            }
        }
        _ => {}
    }
}
