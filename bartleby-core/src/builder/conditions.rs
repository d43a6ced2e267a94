//! The WHERE-clause surface of the query builder

use super::QueryBuilder;
use crate::grammar;
use crate::operator::{IntoOperator, Operator};
use crate::predicate::{Connector, WhereEntry};
use crate::Value;

/// Trait for inputs to `where_`-family methods.
///
/// Covers the accepted call shapes as a closed set of conversions: a
/// `(column, value)` pair defaulting the operator to `=`, an explicit
/// `(column, operator, value)` triple, and vectors of either for batched
/// assignment across several columns in one call.
pub trait IntoConditions {
    fn into_conditions(self) -> Vec<(String, Operator, Value)>;
}

// Shorthand equality: where_(("age", 18))
impl<T> IntoConditions for (&str, T)
where
    T: Into<Value>,
{
    fn into_conditions(self) -> Vec<(String, Operator, Value)> {
        vec![(self.0.to_string(), Operator::EQ, self.1.into())]
    }
}

// Explicit operators: where_(("age", op::GT, 18)) or where_(("age", ">", 18))
impl<T, O> IntoConditions for (&str, O, T)
where
    T: Into<Value>,
    O: IntoOperator,
{
    fn into_conditions(self) -> Vec<(String, Operator, Value)> {
        vec![(self.0.to_string(), self.1.into_operator(), self.2.into())]
    }
}

// Batched equality across columns, zipped positionally
impl<T> IntoConditions for Vec<(&str, T)>
where
    T: Into<Value>,
{
    fn into_conditions(self) -> Vec<(String, Operator, Value)> {
        self.into_iter()
            .map(|(column, value)| (column.to_string(), Operator::EQ, value.into()))
            .collect()
    }
}

// Batched explicit operators
impl<T, O> IntoConditions for Vec<(&str, O, T)>
where
    T: Into<Value>,
    O: IntoOperator,
{
    fn into_conditions(self) -> Vec<(String, Operator, Value)> {
        self.into_iter()
            .map(|(column, operator, value)| {
                (column.to_string(), operator.into_operator(), value.into())
            })
            .collect()
    }
}

impl QueryBuilder {
    /// Add a WHERE condition
    ///
    /// # Examples
    /// ```
    /// use bartleby_core::{from, op};
    ///
    /// let mut query = from("users");
    /// query.where_(("age", op::GT, 18)).where_(("name", "John"));
    /// ```
    pub fn where_<C>(&mut self, condition: C) -> &mut Self
    where
        C: IntoConditions,
    {
        self.push_conditions(condition, Connector::And)
    }

    /// Add an OR WHERE condition
    pub fn or_where<C>(&mut self, condition: C) -> &mut Self
    where
        C: IntoConditions,
    {
        self.push_conditions(condition, Connector::Or)
    }

    /// Add an AND WHERE condition (same as where_)
    pub fn and_where<C>(&mut self, condition: C) -> &mut Self
    where
        C: IntoConditions,
    {
        self.where_(condition)
    }

    /// Group conditions built by the closure into a parenthesized sub-tree.
    ///
    /// The closure receives a fresh builder; the group joins the surrounding
    /// clause with AND. The connector applies to the group as a whole, never
    /// to the entries inside it.
    pub fn where_group<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.push_group(f, Connector::And)
    }

    /// Group conditions built by the closure, joined with OR.
    pub fn or_where_group<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.push_group(f, Connector::Or)
    }

    /// Splice a verbatim SQL fragment into the WHERE clause.
    pub fn where_raw(&mut self, sql: &str) -> &mut Self {
        self.state.wheres.push(WhereEntry::Raw {
            sql: sql.to_string(),
            connector: Connector::And,
        });
        self
    }

    /// Splice a verbatim SQL fragment, joined with OR.
    pub fn or_where_raw(&mut self, sql: &str) -> &mut Self {
        self.state.wheres.push(WhereEntry::Raw {
            sql: sql.to_string(),
            connector: Connector::Or,
        });
        self
    }

    /// Compare two columns; no value is bound.
    pub fn where_column<O: IntoOperator>(&mut self, left: &str, operator: O, right: &str) -> &mut Self {
        self.push_column_compare(left, operator, right, Connector::And)
    }

    /// Compare two columns, joined with OR.
    pub fn or_where_column<O: IntoOperator>(
        &mut self,
        left: &str,
        operator: O,
        right: &str,
    ) -> &mut Self {
        self.push_column_compare(left, operator, right, Connector::Or)
    }

    /// Constrain a column to a list of values.
    ///
    /// The whole list collapses to a single placeholder bound to the
    /// comma-joined literal text of the values, so `where_in("id", vec![1, 2,
    /// 3])` binds the one string `"1,2,3"`.
    pub fn where_in<T: Into<Value>>(&mut self, column: &str, values: Vec<T>) -> &mut Self {
        self.push_in(column, values, false, Connector::And)
    }

    /// `where_in` joined with OR.
    pub fn or_where_in<T: Into<Value>>(&mut self, column: &str, values: Vec<T>) -> &mut Self {
        self.push_in(column, values, false, Connector::Or)
    }

    /// Exclude a column from a list of values. Same single-binding collapse
    /// as `where_in`.
    pub fn where_not_in<T: Into<Value>>(&mut self, column: &str, values: Vec<T>) -> &mut Self {
        self.push_in(column, values, true, Connector::And)
    }

    /// Constrain a column to the result of a subquery built by the closure.
    pub fn where_in_query<F>(&mut self, column: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.push_in_query(column, f, false, Connector::And)
    }

    /// Exclude a column from the result of a subquery built by the closure.
    pub fn where_not_in_query<F>(&mut self, column: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.push_in_query(column, f, true, Connector::And)
    }

    /// Require at least one row from the subquery built by the closure.
    pub fn where_exists<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.push_exists(f, false, Connector::And)
    }

    /// Require no rows from the subquery built by the closure.
    pub fn where_not_exists<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.push_exists(f, true, Connector::And)
    }

    /// `where_exists` joined with OR.
    pub fn or_where_exists<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.push_exists(f, false, Connector::Or)
    }

    fn push_conditions<C: IntoConditions>(&mut self, condition: C, connector: Connector) -> &mut Self {
        for (column, operator, value) in condition.into_conditions() {
            self.state.wheres.push(WhereEntry::Normal {
                column,
                operator,
                connector,
            });
            self.state.bindings.push_where(value);
        }
        self
    }

    fn push_group<F>(&mut self, f: F, connector: Connector) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let mut sub = QueryBuilder::new();
        f(&mut sub);
        if sub.state.wheres.is_empty() {
            return self;
        }
        let bindings = sub.state.bindings.where_values();
        self.state.wheres.push(WhereEntry::Nested {
            children: sub.state.wheres,
            connector,
        });
        self.state.bindings.extend_where(bindings);
        self
    }

    fn push_column_compare<O: IntoOperator>(
        &mut self,
        left: &str,
        operator: O,
        right: &str,
        connector: Connector,
    ) -> &mut Self {
        self.state.wheres.push(WhereEntry::ColumnCompare {
            left: left.to_string(),
            operator: operator.into_operator(),
            right: right.to_string(),
            connector,
        });
        self
    }

    fn push_in<T: Into<Value>>(
        &mut self,
        column: &str,
        values: Vec<T>,
        negated: bool,
        connector: Connector,
    ) -> &mut Self {
        let list = values
            .into_iter()
            .map(|v| v.into().literal())
            .collect::<Vec<_>>()
            .join(",");
        self.state.wheres.push(WhereEntry::In {
            column: column.to_string(),
            negated,
            connector,
        });
        self.state.bindings.push_where(Value::String(list));
        self
    }

    fn push_in_query<F>(&mut self, column: &str, f: F, negated: bool, connector: Connector) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let mut sub = QueryBuilder::new();
        f(&mut sub);
        let sql = grammar::render_select(&sub.state);
        let bindings = sub.state.bindings.flatten_select();
        self.state.wheres.push(WhereEntry::InSub {
            column: column.to_string(),
            sql,
            negated,
            connector,
        });
        self.state.bindings.extend_where(bindings);
        self
    }

    fn push_exists<F>(&mut self, f: F, negated: bool, connector: Connector) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let mut sub = QueryBuilder::new();
        f(&mut sub);
        let sql = grammar::render_select(&sub.state);
        let bindings = sub.state.bindings.flatten_select();
        self.state.wheres.push(WhereEntry::Exists {
            sql,
            negated,
            connector,
        });
        self.state.bindings.extend_where(bindings);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::op;

    #[test]
    fn test_two_argument_form_defaults_to_equality() {
        let conditions = ("name", "John").into_conditions();
        assert_eq!(
            conditions,
            vec![("name".to_string(), Operator::EQ, Value::from("John"))]
        );
    }

    #[test]
    fn test_explicit_operator_form() {
        let conditions = ("age", op::GT, 18).into_conditions();
        assert_eq!(
            conditions,
            vec![("age".to_string(), Operator::GT, Value::I32(18))]
        );
    }

    #[test]
    fn test_string_operator_form() {
        let conditions = ("name", "LIKE", "%john%").into_conditions();
        assert_eq!(
            conditions,
            vec![(
                "name".to_string(),
                Operator::LIKE,
                Value::from("%john%")
            )]
        );
    }

    #[test]
    fn test_batched_form_zips_positionally() {
        let conditions = vec![("a", 1), ("b", 2)].into_conditions();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].0, "a");
        assert_eq!(conditions[0].1, Operator::EQ);
        assert_eq!(conditions[1].2, Value::I32(2));
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let mut query = QueryBuilder::new();
        query.table("users").where_group(|_| {});
        assert!(query.state.wheres.is_empty());
    }
}
