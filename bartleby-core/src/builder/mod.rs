//! The fluent query builder
//!
//! One `QueryBuilder` instance accumulates state for a single logical query,
//! renders and executes it through a terminal method, and then restores
//! itself to its initial snapshot so the instance can be reused without
//! leaking predicates into the next query.

pub mod conditions;
pub mod joins;
pub mod payload;

use crate::binding::BindingStore;
use crate::executor::{Connection, Executor, Outcome, PreparedQuery, RawOutcome, StatementKind};
use crate::grammar;
use crate::join::JoinDescriptor;
use crate::predicate::PredicateTree;
use crate::value::Record;
use crate::{Result, Value};

use self::payload::{Assign, IntoAssignments, IntoRows};

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// A selected column: either a plain identifier or a rendered sub-select
/// with an alias. Sub-select bindings are merged into the owning builder's
/// select bucket at construction time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    Column(String),
    SubSelect { sql: String, alias: String },
}

/// Every mutable field of a builder, snapshotted at construction for reset.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryState {
    pub(crate) table: String,
    pub(crate) columns: Vec<Projection>,
    pub(crate) wheres: PredicateTree,
    pub(crate) joins: Vec<JoinDescriptor>,
    pub(crate) group_by: Vec<String>,
    pub(crate) order_by: Vec<(String, SortDirection)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) bindings: BindingStore,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            table: String::new(),
            columns: vec![Projection::Column("*".to_string())],
            wheres: PredicateTree::new(),
            joins: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            bindings: BindingStore::new(),
        }
    }
}

/// Fluent SQL query builder
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) state: QueryState,
    snapshot: QueryState,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Create a fresh builder with no target table and a wildcard projection.
    pub fn new() -> Self {
        let state = QueryState::default();
        Self {
            snapshot: state.clone(),
            state,
        }
    }

    /// Set the target table.
    pub fn table(&mut self, name: &str) -> &mut Self {
        self.state.table = name.to_string();
        self
    }

    /// Set the target table and select columns in one call.
    pub fn table_with<T>(&mut self, name: &str, columns: T) -> &mut Self
    where
        T: IntoColumns,
    {
        self.table(name);
        self.select(columns)
    }

    /// Select specific columns.
    ///
    /// Accepts a single name, a tuple, a vector, or a nested vector
    /// (flattened). Duplicate identifiers are dropped after quoting, and a
    /// previously-registered wildcard gives way to the first explicit column.
    ///
    /// # Examples
    /// ```
    /// use bartleby_core::from;
    ///
    /// let mut query = from("users");
    /// query.select(("id", "name", "email"));
    /// ```
    pub fn select<T>(&mut self, columns: T) -> &mut Self
    where
        T: IntoColumns,
    {
        let incoming = columns.into_columns();
        if incoming.is_empty() {
            return self;
        }
        self.state
            .columns
            .retain(|p| !matches!(p, Projection::Column(c) if c == "*"));
        for column in incoming {
            let rendered = grammar::wrap(&column);
            let duplicate = self.state.columns.iter().any(|p| match p {
                Projection::Column(c) => grammar::wrap(c) == rendered,
                Projection::SubSelect { .. } => false,
            });
            if !duplicate {
                self.state.columns.push(Projection::Column(column));
            }
        }
        self
    }

    /// Add a computed column: `(SELECT ...) AS alias`.
    ///
    /// The closure receives a fresh builder; its rendered SELECT becomes the
    /// column expression and its bindings join the select bucket here.
    pub fn select_sub<F>(&mut self, alias: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let mut sub = QueryBuilder::new();
        f(&mut sub);
        let sql = grammar::render_select(&sub.state);
        let bindings = sub.state.bindings.flatten_select();
        self.state
            .columns
            .retain(|p| !matches!(p, Projection::Column(c) if c == "*"));
        self.state.columns.push(Projection::SubSelect {
            sql,
            alias: alias.to_string(),
        });
        self.state.bindings.extend_select(bindings);
        self
    }

    /// Add a GROUP BY clause
    pub fn group_by<T>(&mut self, columns: T) -> &mut Self
    where
        T: IntoColumns,
    {
        self.state.group_by.extend(columns.into_columns());
        self
    }

    /// Add an ORDER BY clause
    pub fn order_by(&mut self, column: &str, direction: SortDirection) -> &mut Self {
        self.state.order_by.push((column.to_string(), direction));
        self
    }

    /// Add an ORDER BY ASC clause (convenience method)
    pub fn order_by_asc(&mut self, column: &str) -> &mut Self {
        self.order_by(column, SortDirection::Asc)
    }

    /// Add an ORDER BY DESC clause (convenience method)
    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.order_by(column, SortDirection::Desc)
    }

    /// Set the LIMIT clause. An unset offset defaults to 0.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.state.limit = Some(limit);
        if self.state.offset.is_none() {
            self.state.offset = Some(0);
        }
        self
    }

    /// Set the OFFSET clause, floored at 0.
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.state.offset = Some(offset.max(0) as u64);
        self
    }

    /// Conditionally apply a configuration callback.
    pub fn when<F>(&mut self, condition: bool, f: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        if condition {
            f(self);
        }
        self
    }

    /// Restore every mutable field from the construction-time snapshot.
    ///
    /// Runs automatically after every terminal operation, success or failure.
    pub fn reset(&mut self) -> &mut Self {
        self.state = self.snapshot.clone();
        self
    }

    /// Execute as SELECT and return all rows, or `fallback` on failure.
    pub fn all<C: Connection>(&mut self, exec: &mut Executor<C>, fallback: Vec<Record>) -> Vec<Record> {
        let mut query = self.render_select();
        let outcome = exec.run(&mut query);
        self.reset();
        match outcome {
            Outcome::Rows(rows) => rows,
            _ => fallback,
        }
    }

    /// Execute as SELECT with LIMIT 1 and return the first row, or
    /// `fallback` on failure or an empty result.
    pub fn one<C: Connection>(&mut self, exec: &mut Executor<C>, fallback: Record) -> Record {
        self.limit(1);
        let mut query = self.render_select();
        let outcome = exec.run(&mut query);
        self.reset();
        match outcome {
            Outcome::Rows(rows) => rows.into_iter().next().unwrap_or(fallback),
            _ => fallback,
        }
    }

    /// Execute as SELECT and return the value at column `index` of the first
    /// row, or `fallback`.
    pub fn column<C: Connection>(
        &mut self,
        exec: &mut Executor<C>,
        fallback: serde_json::Value,
        index: usize,
    ) -> serde_json::Value {
        self.limit(1);
        let mut query = self.render_select();
        let outcome = exec.run(&mut query);
        self.reset();
        match outcome {
            Outcome::Rows(rows) => rows
                .first()
                .and_then(|row| row.values().nth(index).cloned())
                .unwrap_or(fallback),
            _ => fallback,
        }
    }

    /// Insert one or more rows and return the generated identifier.
    ///
    /// Returns `None` without touching the connection when the target table
    /// or the payload is empty, and `None` on execution failure.
    pub fn insert<C: Connection, R: IntoRows>(
        &mut self,
        exec: &mut Executor<C>,
        rows: R,
    ) -> Option<String> {
        let rows = rows.into_rows();
        if self.state.table.is_empty() || rows.is_empty() || rows[0].is_empty() {
            self.reset();
            return None;
        }
        let (columns, value_rows) = payload::normalize_rows(rows);
        for row in &value_rows {
            for value in row {
                self.state.bindings.push_data(value.clone());
            }
        }
        let sql = grammar::render_insert(&self.state.table, &columns, value_rows.len());
        let bindings = self.state.bindings.flatten_insert();
        let mut query = PreparedQuery::with_kind(sql, bindings, StatementKind::Insert);
        let outcome = exec.run(&mut query);
        self.reset();
        match outcome {
            Outcome::InsertId(id) => Some(id),
            _ => None,
        }
    }

    /// Apply assignments to every row matching the accumulated predicates.
    ///
    /// Returns `false` without touching the connection when the target table
    /// or the payload is empty, and `false` on execution failure.
    pub fn update<C: Connection, A: IntoAssignments>(
        &mut self,
        exec: &mut Executor<C>,
        data: A,
    ) -> bool {
        let assigns = data.into_assignments();
        if self.state.table.is_empty() || assigns.is_empty() {
            self.reset();
            return false;
        }
        for (_, assign) in &assigns {
            if let Assign::Value(value) = assign {
                self.state.bindings.push_data(value.clone());
            }
        }
        let sql = grammar::render_update(&self.state, &assigns);
        let bindings = self.state.bindings.flatten_update();
        let mut query = PreparedQuery::with_kind(sql, bindings, StatementKind::Update);
        let outcome = exec.run(&mut query);
        self.reset();
        matches!(outcome, Outcome::Affected(_))
    }

    /// Delete every row matching the accumulated predicates.
    ///
    /// Returns `false` without touching the connection when no target table
    /// is set, and `false` on execution failure.
    pub fn delete<C: Connection>(&mut self, exec: &mut Executor<C>) -> bool {
        if self.state.table.is_empty() {
            self.reset();
            return false;
        }
        let sql = grammar::render_delete(&self.state);
        let bindings = self.state.bindings.flatten_delete();
        let mut query = PreparedQuery::with_kind(sql, bindings, StatementKind::Delete);
        let outcome = exec.run(&mut query);
        self.reset();
        matches!(outcome, Outcome::Affected(_))
    }

    /// Execute caller-supplied SQL directly, bypassing the accumulated state.
    ///
    /// The leading verb decides the result shape; an unrecognized verb is a
    /// hard error, since it cannot be dispatched.
    pub fn raw<C: Connection>(
        &mut self,
        exec: &mut Executor<C>,
        sql: &str,
        bindings: Vec<Value>,
    ) -> Result<RawOutcome> {
        let mut query = match PreparedQuery::new(sql, bindings) {
            Ok(query) => query,
            Err(err) => {
                self.reset();
                return Err(err);
            }
        };
        let kind = query.kind();
        let outcome = exec.run(&mut query);
        self.reset();
        Ok(match outcome {
            Outcome::Rows(rows) => RawOutcome::Rows(rows),
            Outcome::InsertId(id) => RawOutcome::InsertId(id),
            Outcome::Affected(_) => RawOutcome::Done(true),
            Outcome::Failed { .. } => match kind {
                StatementKind::Select => RawOutcome::Rows(Vec::new()),
                _ => RawOutcome::Done(false),
            },
        })
    }

    pub(crate) fn render_select(&self) -> PreparedQuery {
        let sql = grammar::render_select(&self.state);
        let bindings = self.state.bindings.flatten_select();
        PreparedQuery::with_kind(sql, bindings, StatementKind::Select)
    }
}

/// Trait for types that can be converted to column lists
pub trait IntoColumns {
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(|s| s.to_string()).collect()
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self
    }
}

// Nested lists are flattened
impl IntoColumns for Vec<Vec<&str>> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter()
            .flatten()
            .map(|s| s.to_string())
            .collect()
    }
}

impl IntoColumns for (&str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string(), self.2.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![
            self.0.to_string(),
            self.1.to_string(),
            self.2.to_string(),
            self.3.to_string(),
        ]
    }
}

impl IntoColumns for (&str, &str, &str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![
            self.0.to_string(),
            self.1.to_string(),
            self.2.to_string(),
            self.3.to_string(),
            self.4.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from;

    #[test]
    fn test_select_replaces_wildcard() {
        let mut query = from("users");
        query.select(("id", "name"));
        let sql = grammar::render_select(&query.state);
        assert_eq!(sql, "SELECT `id`, `name` FROM `users`");
    }

    #[test]
    fn test_table_with_forwards_to_select() {
        let mut query = QueryBuilder::new();
        query.table_with("users", ("id", "email"));
        let sql = grammar::render_select(&query.state);
        assert_eq!(sql, "SELECT `id`, `email` FROM `users`");
    }

    #[test]
    fn test_select_deduplicates_after_quoting() {
        let mut query = from("users");
        query.select("id").select("id").select("name");
        let sql = grammar::render_select(&query.state);
        assert_eq!(sql, "SELECT `id`, `name` FROM `users`");
    }

    #[test]
    fn test_select_flattens_nested_lists() {
        let mut query = from("users");
        query.select(vec![vec!["id", "name"], vec!["email"]]);
        let sql = grammar::render_select(&query.state);
        assert_eq!(sql, "SELECT `id`, `name`, `email` FROM `users`");
    }

    #[test]
    fn test_limit_defaults_offset_to_zero() {
        let mut query = from("users");
        query.limit(10);
        let sql = grammar::render_select(&query.state);
        assert_eq!(sql, "SELECT * FROM `users` LIMIT 10 OFFSET 0");
    }

    #[test]
    fn test_offset_floored_at_zero() {
        let mut query = from("users");
        query.limit(10).offset(-5);
        let sql = grammar::render_select(&query.state);
        assert_eq!(sql, "SELECT * FROM `users` LIMIT 10 OFFSET 0");
    }

    #[test]
    fn test_when_applies_callback_conditionally() {
        let mut query = from("users");
        query
            .when(true, |q| {
                q.select("id");
            })
            .when(false, |q| {
                q.select("never");
            });
        let sql = grammar::render_select(&query.state);
        assert_eq!(sql, "SELECT `id` FROM `users`");
    }

    #[test]
    fn test_manual_reset_restores_initial_state() {
        let mut query = from("users");
        query.select("id").where_(("age", 18)).limit(5);
        query.reset();
        let sql = grammar::render_select(&query.state);
        assert_eq!(sql, "SELECT * FROM ``");
        assert!(query.state.bindings.is_empty());
    }

    #[test]
    fn test_select_sub_merges_bindings_first() {
        let mut query = from("users");
        query
            .select_sub("post_count", |sub| {
                sub.table("posts").select("COUNT(*)").where_(("status", "live"));
            })
            .where_(("active", true));

        let sql = grammar::render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT (SELECT COUNT(*) FROM `posts` WHERE `posts`.`status` = ?) AS `post_count` \
             FROM `users` WHERE `users`.`active` = ?"
        );
        // Sub-select binding precedes the outer where binding, matching the
        // order their placeholders take in the text.
        assert_eq!(
            query.state.bindings.flatten_select(),
            vec![Value::from("live"), Value::from(true)]
        );
    }
}
