//! The JOIN surface of the query builder

use super::conditions::IntoConditions;
use super::QueryBuilder;
use crate::join::{JoinDescriptor, JoinType};
use crate::operator::IntoOperator;
use crate::predicate::{Connector, PredicateTree, WhereEntry};
use crate::Value;

/// Builder for a join's ON conditions, handed to `join_on` closures.
///
/// `on`/`or_on` compare columns; the `where_`-style methods bind values
/// inside the ON clause. Bound values are merged into the parent builder's
/// join bucket when the descriptor is attached.
#[derive(Debug, Default)]
pub struct JoinOn {
    on: PredicateTree,
    bindings: Vec<Value>,
}

impl JoinOn {
    fn new() -> Self {
        Self::default()
    }

    /// Compare a column of the joined table with another column.
    pub fn on<O: IntoOperator>(&mut self, left: &str, operator: O, right: &str) -> &mut Self {
        self.push_on(left, operator, right, Connector::And)
    }

    /// Column comparison joined with OR.
    pub fn or_on<O: IntoOperator>(&mut self, left: &str, operator: O, right: &str) -> &mut Self {
        self.push_on(left, operator, right, Connector::Or)
    }

    /// Bind a value condition inside the ON clause.
    pub fn where_<C: IntoConditions>(&mut self, condition: C) -> &mut Self {
        self.push_conditions(condition, Connector::And)
    }

    /// Bind a value condition inside the ON clause, joined with OR.
    pub fn or_where<C: IntoConditions>(&mut self, condition: C) -> &mut Self {
        self.push_conditions(condition, Connector::Or)
    }

    fn push_on<O: IntoOperator>(
        &mut self,
        left: &str,
        operator: O,
        right: &str,
        connector: Connector,
    ) -> &mut Self {
        self.on.push(WhereEntry::ColumnCompare {
            left: left.to_string(),
            operator: operator.into_operator(),
            right: right.to_string(),
            connector,
        });
        self
    }

    fn push_conditions<C: IntoConditions>(&mut self, condition: C, connector: Connector) -> &mut Self {
        for (column, operator, value) in condition.into_conditions() {
            self.on.push(WhereEntry::Normal {
                column,
                operator,
                connector,
            });
            self.bindings.push(value);
        }
        self
    }
}

impl QueryBuilder {
    /// Add an INNER JOIN with a single column-comparison condition.
    ///
    /// # Examples
    /// ```
    /// use bartleby_core::from;
    ///
    /// let mut query = from("users");
    /// query.join("profiles", "users.id", "=", "profiles.user_id");
    /// ```
    pub fn join<O: IntoOperator>(&mut self, table: &str, left: &str, operator: O, right: &str) -> &mut Self {
        self.push_simple_join(JoinType::Inner, table, left, operator, right)
    }

    /// Add a LEFT JOIN with a single column-comparison condition.
    pub fn left_join<O: IntoOperator>(
        &mut self,
        table: &str,
        left: &str,
        operator: O,
        right: &str,
    ) -> &mut Self {
        self.push_simple_join(JoinType::Left, table, left, operator, right)
    }

    /// Add a RIGHT JOIN with a single column-comparison condition.
    pub fn right_join<O: IntoOperator>(
        &mut self,
        table: &str,
        left: &str,
        operator: O,
        right: &str,
    ) -> &mut Self {
        self.push_simple_join(JoinType::Right, table, left, operator, right)
    }

    /// Add a CROSS JOIN; carries no ON conditions.
    pub fn cross_join(&mut self, table: &str) -> &mut Self {
        self.state.joins.push(JoinDescriptor {
            join_type: JoinType::Cross,
            table: table.to_string(),
            on: PredicateTree::new(),
        });
        self
    }

    /// Add a join whose ON clause is built by a closure, for the
    /// multi-condition case.
    ///
    /// # Examples
    /// ```
    /// use bartleby_core::{from, JoinType};
    ///
    /// let mut query = from("users");
    /// query.join_on("orders", JoinType::Left, |on| {
    ///     on.on("users.id", "=", "orders.user_id")
    ///         .where_(("orders.status", "open"));
    /// });
    /// ```
    pub fn join_on<F>(&mut self, table: &str, join_type: JoinType, f: F) -> &mut Self
    where
        F: FnOnce(&mut JoinOn),
    {
        let mut on = JoinOn::new();
        f(&mut on);
        self.state.joins.push(JoinDescriptor {
            join_type,
            table: table.to_string(),
            on: on.on,
        });
        self.state.bindings.extend_join(on.bindings);
        self
    }

    fn push_simple_join<O: IntoOperator>(
        &mut self,
        join_type: JoinType,
        table: &str,
        left: &str,
        operator: O,
        right: &str,
    ) -> &mut Self {
        let mut on = PredicateTree::new();
        on.push(WhereEntry::ColumnCompare {
            left: left.to_string(),
            operator: operator.into_operator(),
            right: right.to_string(),
            connector: Connector::And,
        });
        self.state.joins.push(JoinDescriptor {
            join_type,
            table: table.to_string(),
            on,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from;
    use crate::grammar;

    #[test]
    fn test_simple_join_registers_descriptor() {
        let mut query = from("users");
        query.join("profiles", "users.id", "=", "profiles.user_id");
        assert_eq!(query.state.joins.len(), 1);
        assert_eq!(query.state.joins[0].join_type, JoinType::Inner);
        assert_eq!(query.state.joins[0].table, "profiles");
    }

    #[test]
    fn test_joins_render_in_registration_order() {
        let mut query = from("users");
        query
            .left_join("profiles", "users.id", "=", "profiles.user_id")
            .join("orders", "users.id", "=", "orders.user_id");
        let sql = grammar::render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT * FROM `users` \
             LEFT JOIN `profiles` ON `users`.`id` = `profiles`.`user_id` \
             INNER JOIN `orders` ON `users`.`id` = `orders`.`user_id`"
        );
    }

    #[test]
    fn test_join_on_closure_merges_bindings_into_join_bucket() {
        let mut query = from("users");
        query
            .where_(("active", true))
            .join_on("orders", JoinType::Inner, |on| {
                on.on("users.id", "=", "orders.user_id")
                    .where_(("orders.status", "open"));
            })
            .where_(("age", ">", 18));

        let sql = grammar::render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT * FROM `users` \
             INNER JOIN `orders` ON `users`.`id` = `orders`.`user_id` AND `orders`.`status` = ? \
             WHERE `users`.`active` = ? AND `users`.`age` > ?"
        );
        // The join binding sits at the offset of its placeholder: before
        // both where bindings, even though one where was registered first.
        assert_eq!(
            query.state.bindings.flatten_select(),
            vec![Value::from("open"), Value::from(true), Value::I32(18)]
        );
    }

    #[test]
    fn test_cross_join_has_no_on_clause() {
        let mut query = from("sizes");
        query.cross_join("colors");
        let sql = grammar::render_select(&query.state);
        assert_eq!(sql, "SELECT * FROM `sizes` CROSS JOIN `colors`");
    }
}
