//! SQL rendering
//!
//! Pure functions from accumulated builder state to statement text. Bindings
//! are never produced here; they are staged in the [`BindingStore`] as the
//! builder runs, and callers pair the rendered text with the store's
//! flattened list for the matching statement kind.
//!
//! [`BindingStore`]: crate::binding::BindingStore

use crate::builder::payload::Assign;
use crate::builder::{Projection, QueryState};
use crate::join::{JoinDescriptor, JoinType};
use crate::predicate::{PredicateTree, WhereEntry};

/// Text that must not be identifier-quoted: function calls, wildcards, and
/// anything already carrying spaces (aliases, DISTINCT prefixes).
pub fn is_raw_expression(text: &str) -> bool {
    text.contains('(') || text.contains('*') || text.contains(' ')
}

/// Backtick-wrap each dot-separated segment of an identifier; raw
/// expressions pass through untouched.
pub fn wrap(identifier: &str) -> String {
    let trimmed = identifier.trim();
    if is_raw_expression(trimmed) {
        return trimmed.to_string();
    }
    trimmed
        .split('.')
        .map(|segment| format!("`{}`", segment))
        .collect::<Vec<_>>()
        .join(".")
}

/// Qualify a bare column with the owning table, then quote. Columns already
/// carrying a table prefix, and raw expressions, are left as they are.
pub fn qualify(column: &str, table: &str) -> String {
    let trimmed = column.trim();
    if is_raw_expression(trimmed) {
        return trimmed.to_string();
    }
    if table.is_empty() || trimmed.contains('.') {
        wrap(trimmed)
    } else {
        wrap(&format!("{}.{}", table, trimmed))
    }
}

/// Render a predicate tree into WHERE-clause text, without the keyword.
///
/// Entries render in insertion order; the first rendered entry's connector
/// is omitted. Nested groups recurse with no owning table, so their columns
/// stay unqualified. Stray leading or trailing connectors are trimmed as a
/// guard against a tree whose first entry carries one in its text.
pub fn render_where(tree: &PredicateTree, table: &str) -> String {
    let mut sql = String::new();
    for (i, entry) in tree.entries().iter().enumerate() {
        let text = match entry {
            WhereEntry::Normal {
                column, operator, ..
            } => format!("{} {} ?", qualify(column, table), operator),
            WhereEntry::Raw { sql, .. } => sql.clone(),
            WhereEntry::ColumnCompare {
                left,
                operator,
                right,
                ..
            } => format!(
                "{} {} {}",
                qualify(left, table),
                operator,
                qualify(right, table)
            ),
            WhereEntry::Exists { sql, negated, .. } => {
                if *negated {
                    format!("NOT EXISTS ({})", sql)
                } else {
                    format!("EXISTS ({})", sql)
                }
            }
            WhereEntry::In {
                column, negated, ..
            } => format!(
                "{} {} (?)",
                qualify(column, table),
                if *negated { "NOT IN" } else { "IN" }
            ),
            WhereEntry::InSub {
                column,
                sql,
                negated,
                ..
            } => format!(
                "{} {} ({})",
                qualify(column, table),
                if *negated { "NOT IN" } else { "IN" },
                sql
            ),
            WhereEntry::Nested { children, .. } => {
                format!("( {} )", render_where(children, ""))
            }
        };
        if i == 0 {
            sql.push_str(&text);
        } else {
            sql.push(' ');
            sql.push_str(entry.connector().as_str());
            sql.push(' ');
            sql.push_str(&text);
        }
    }
    strip_boolean_edges(&sql)
}

fn strip_boolean_edges(sql: &str) -> String {
    let mut text = sql.trim();
    loop {
        if let Some(rest) = text.strip_prefix("AND ") {
            text = rest.trim_start();
        } else if let Some(rest) = text.strip_prefix("OR ") {
            text = rest.trim_start();
        } else {
            break;
        }
    }
    loop {
        if let Some(rest) = text.strip_suffix(" AND") {
            text = rest.trim_end();
        } else if let Some(rest) = text.strip_suffix(" OR") {
            text = rest.trim_end();
        } else {
            break;
        }
    }
    text.to_string()
}

/// Render registered joins in order, each with its ON conditions.
pub fn render_joins(joins: &[JoinDescriptor]) -> String {
    let mut sql = String::new();
    for join in joins {
        sql.push(' ');
        sql.push_str(&join.join_type.to_string());
        sql.push_str(" JOIN ");
        sql.push_str(&wrap(&join.table));
        if join.join_type != JoinType::Cross && !join.on.is_empty() {
            sql.push_str(" ON ");
            sql.push_str(&render_where(&join.on, ""));
        }
    }
    sql
}

fn render_projection(projection: &Projection) -> String {
    match projection {
        Projection::Column(column) => wrap(column),
        Projection::SubSelect { sql, alias } => format!("({}) AS `{}`", sql, alias),
    }
}

/// Render a complete SELECT statement.
pub(crate) fn render_select(state: &QueryState) -> String {
    let mut sql = String::from("SELECT ");

    let columns: Vec<String> = if state.columns.is_empty() {
        vec!["*".to_string()]
    } else {
        state.columns.iter().map(render_projection).collect()
    };
    sql.push_str(&columns.join(", "));

    sql.push_str(" FROM ");
    sql.push_str(&wrap(&state.table));

    sql.push_str(&render_joins(&state.joins));

    let where_text = render_where(&state.wheres, &state.table);
    if !where_text.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_text);
    }

    if !state.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        let columns: Vec<String> = state.group_by.iter().map(|c| wrap(c)).collect();
        sql.push_str(&columns.join(", "));
    }

    if !state.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        let parts: Vec<String> = state
            .order_by
            .iter()
            .map(|(column, direction)| format!("{} {}", wrap(column), direction))
            .collect();
        sql.push_str(&parts.join(", "));
    }

    if let Some(limit) = state.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    if let Some(offset) = state.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    sql
}

/// Render an INSERT statement for `row_count` rows of the given columns.
/// Placeholder groups mirror row boundaries exactly.
pub fn render_insert(table: &str, columns: &[String], row_count: usize) -> String {
    let column_list = columns.iter().map(|c| wrap(c)).collect::<Vec<_>>().join(", ");
    let group = format!(
        "({})",
        std::iter::repeat("?")
            .take(columns.len())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let groups = std::iter::repeat(group)
        .take(row_count)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        wrap(table),
        column_list,
        groups
    )
}

/// Render an UPDATE statement. `Assign::Raw` splices its text in place of a
/// placeholder and the caller stages no binding for it.
pub(crate) fn render_update(state: &QueryState, assigns: &[(String, Assign)]) -> String {
    let mut sql = format!("UPDATE {}", wrap(&state.table));

    sql.push_str(&render_joins(&state.joins));

    sql.push_str(" SET ");
    let parts: Vec<String> = assigns
        .iter()
        .map(|(column, assign)| match assign {
            Assign::Value(_) => format!("{} = ?", wrap(column)),
            Assign::Raw(text) => format!("{} = {}", wrap(column), text),
        })
        .collect();
    sql.push_str(&parts.join(", "));

    let where_text = render_where(&state.wheres, &state.table);
    if !where_text.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_text);
    }

    if !state.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        let parts: Vec<String> = state
            .order_by
            .iter()
            .map(|(column, direction)| format!("{} {}", wrap(column), direction))
            .collect();
        sql.push_str(&parts.join(", "));
    }

    if let Some(limit) = state.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    sql
}

/// Render a DELETE statement.
pub(crate) fn render_delete(state: &QueryState) -> String {
    let mut sql = format!("DELETE FROM {}", wrap(&state.table));

    sql.push_str(&render_joins(&state.joins));

    let where_text = render_where(&state.wheres, &state.table);
    if !where_text.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_text);
    }

    if !state.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        let parts: Vec<String> = state
            .order_by
            .iter()
            .map(|(column, direction)| format!("{} {}", wrap(column), direction))
            .collect();
        sql.push_str(&parts.join(", "));
    }

    if let Some(limit) = state.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::payload::{normalize_rows, Assign};
    use crate::from;
    use crate::Value;

    #[test]
    fn test_wrap_identifiers() {
        assert_eq!(wrap("name"), "`name`");
        assert_eq!(wrap("users.name"), "`users`.`name`");
        assert_eq!(wrap("*"), "*");
        assert_eq!(wrap("users.*"), "users.*");
        assert_eq!(wrap("COUNT(id)"), "COUNT(id)");
        assert_eq!(wrap("DISTINCT name"), "DISTINCT name");
    }

    #[test]
    fn test_qualify_bare_columns_only() {
        assert_eq!(qualify("age", "users"), "`users`.`age`");
        assert_eq!(qualify("users.age", "users"), "`users`.`age`");
        assert_eq!(qualify("orders.total", "users"), "`orders`.`total`");
        assert_eq!(qualify("age", ""), "`age`");
        assert_eq!(qualify("COUNT(*)", "users"), "COUNT(*)");
    }

    #[test]
    fn test_where_tree_round_trip() {
        let mut query = from("users");
        query.where_(("a", 1)).or_where(("b", 2));
        let sql = render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `users`.`a` = ? OR `users`.`b` = ?"
        );
        assert_eq!(
            query.state.bindings.flatten_select(),
            vec![Value::I32(1), Value::I32(2)]
        );
    }

    #[test]
    fn test_nested_predicate_connector_placement() {
        let mut query = from("users");
        query.where_(("c", 3)).where_group(|q| {
            q.where_(("a", 1)).or_where(("b", 2));
        });
        let sql = render_select(&query.state);
        // The group joins with the connector of the enclosing call; entries
        // inside it keep their own connectors and stay unqualified.
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `users`.`c` = ? AND ( `a` = ? OR `b` = ? )"
        );
        assert_eq!(
            query.state.bindings.flatten_select(),
            vec![Value::I32(3), Value::I32(1), Value::I32(2)]
        );
    }

    #[test]
    fn test_or_connector_on_nested_group() {
        let mut query = from("users");
        query.where_(("c", 3)).or_where_group(|q| {
            q.where_(("a", 1)).where_(("b", 2));
        });
        let sql = render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `users`.`c` = ? OR ( `a` = ? AND `b` = ? )"
        );
    }

    #[test]
    fn test_group_as_first_entry_omits_connector() {
        let mut query = from("users");
        query.where_group(|q| {
            q.where_(("a", 1)).or_where(("b", 2));
        });
        let sql = render_select(&query.state);
        assert_eq!(sql, "SELECT * FROM `users` WHERE ( `a` = ? OR `b` = ? )");
    }

    #[test]
    fn test_where_in_single_binding_policy() {
        let mut query = from("users");
        query.where_in("id", vec![1, 2, 3]);
        let sql = render_select(&query.state);
        assert_eq!(sql, "SELECT * FROM `users` WHERE `users`.`id` IN (?)");
        // One placeholder, one comma-joined literal binding - not three.
        assert_eq!(sql.matches('?').count(), 1);
        assert_eq!(
            query.state.bindings.flatten_select(),
            vec![Value::String("1,2,3".to_string())]
        );
    }

    #[test]
    fn test_where_not_in() {
        let mut query = from("users");
        query.where_not_in("status", vec!["banned", "deleted"]);
        let sql = render_select(&query.state);
        assert_eq!(sql, "SELECT * FROM `users` WHERE `users`.`status` NOT IN (?)");
        assert_eq!(
            query.state.bindings.flatten_select(),
            vec![Value::String("banned,deleted".to_string())]
        );
    }

    #[test]
    fn test_where_in_subquery() {
        let mut query = from("users");
        query.where_in_query("id", |sub| {
            sub.table("orders").select("user_id").where_(("total", ">", 100));
        });
        let sql = render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `users`.`id` IN \
             (SELECT `user_id` FROM `orders` WHERE `orders`.`total` > ?)"
        );
        assert_eq!(
            query.state.bindings.flatten_select(),
            vec![Value::I32(100)]
        );
    }

    #[test]
    fn test_where_exists_and_not_exists() {
        let mut query = from("users");
        query.where_exists(|sub| {
            sub.table("orders").where_column("orders.user_id", "=", "users.id");
        });
        let sql = render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE EXISTS \
             (SELECT * FROM `orders` WHERE `orders`.`user_id` = `users`.`id`)"
        );

        let mut query = from("users");
        query.where_not_exists(|sub| {
            sub.table("bans").where_column("bans.user_id", "=", "users.id");
        });
        let sql = render_select(&query.state);
        assert!(sql.contains("WHERE NOT EXISTS (SELECT * FROM `bans`"));
    }

    #[test]
    fn test_where_column_renders_no_placeholder() {
        let mut query = from("users");
        query.where_column("created_at", "<", "updated_at");
        let sql = render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `users`.`created_at` < `users`.`updated_at`"
        );
        assert_eq!(sql.matches('?').count(), 0);
    }

    #[test]
    fn test_where_raw_splices_verbatim() {
        let mut query = from("users");
        query.where_(("active", true)).or_where_raw("deleted_at IS NULL");
        let sql = render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `users`.`active` = ? OR deleted_at IS NULL"
        );
    }

    #[test]
    fn test_stray_leading_connector_is_stripped() {
        let mut query = from("users");
        query.where_raw("AND balance > 0");
        let sql = render_select(&query.state);
        assert_eq!(sql, "SELECT * FROM `users` WHERE balance > 0");
    }

    #[test]
    fn test_empty_tree_omits_where_keyword() {
        let query = from("users");
        let sql = render_select(&query.state);
        assert_eq!(sql, "SELECT * FROM `users`");
    }

    #[test]
    fn test_group_order_limit_offset_render_in_fixed_order() {
        let mut query = from("events");
        query
            .select(("kind", "COUNT(*) AS total"))
            .where_(("level", ">=", 2))
            .group_by("kind")
            .order_by_desc("total")
            .limit(20)
            .offset(40);
        let sql = render_select(&query.state);
        assert_eq!(
            sql,
            "SELECT `kind`, COUNT(*) AS total FROM `events` \
             WHERE `events`.`level` >= ? GROUP BY `kind` \
             ORDER BY `total` DESC LIMIT 20 OFFSET 40"
        );
    }

    #[test]
    fn test_multi_row_insert_row_boundaries() {
        let rows = vec![
            vec![("a".to_string(), Value::I32(1)), ("b".to_string(), Value::I32(2))],
            vec![("a".to_string(), Value::I32(3)), ("b".to_string(), Value::I32(4))],
        ];
        let (columns, value_rows) = normalize_rows(rows);
        let sql = render_insert("items", &columns, value_rows.len());
        assert_eq!(
            sql,
            "INSERT INTO `items` (`a`, `b`) VALUES (?, ?), (?, ?)"
        );
        // Bindings flatten row-major.
        let flat: Vec<Value> = value_rows.into_iter().flatten().collect();
        assert_eq!(
            flat,
            vec![Value::I32(1), Value::I32(2), Value::I32(3), Value::I32(4)]
        );
        assert_eq!(sql.matches('?').count(), flat.len());
    }

    #[test]
    fn test_single_row_insert() {
        let (columns, value_rows) = normalize_rows(vec![vec![
            ("name".to_string(), Value::from("John")),
            ("age".to_string(), Value::I32(30)),
        ]]);
        let sql = render_insert("users", &columns, value_rows.len());
        assert_eq!(sql, "INSERT INTO `users` (`name`, `age`) VALUES (?, ?)");
    }

    #[test]
    fn test_update_with_raw_assignment() {
        let mut query = from("pages");
        query.where_(("id", 7));
        let assigns = vec![
            ("title".to_string(), Assign::value("Home")),
            ("hits".to_string(), Assign::raw("hits + 1")),
        ];
        let sql = render_update(&query.state, &assigns);
        assert_eq!(
            sql,
            "UPDATE `pages` SET `title` = ?, `hits` = hits + 1 WHERE `pages`.`id` = ?"
        );
        // The raw assignment contributes no placeholder.
        assert_eq!(sql.matches('?').count(), 2);
    }

    #[test]
    fn test_delete_statement() {
        let mut query = from("sessions");
        query.where_(("expired", true));
        let sql = render_delete(&query.state);
        assert_eq!(sql, "DELETE FROM `sessions` WHERE `sessions`.`expired` = ?");
    }

    #[test]
    fn test_binding_placeholder_parity_across_clauses() {
        let mut query = from("users");
        query
            .select_sub("order_total", |sub| {
                sub.table("orders")
                    .select("SUM(total)")
                    .where_(("status", "paid"));
            })
            .where_(("active", true))
            .join_on("profiles", crate::JoinType::Left, |on| {
                on.on("users.id", "=", "profiles.user_id")
                    .where_(("profiles.kind", "public"));
            })
            .where_in("role", vec!["admin", "editor"])
            .where_group(|q| {
                q.where_(("age", ">", 18)).or_where(("verified", true));
            });

        let sql = render_select(&query.state);
        let bindings = query.state.bindings.flatten_select();
        assert_eq!(sql.matches('?').count(), bindings.len());
        // Sub-select first, then join, then wheres in order.
        assert_eq!(
            bindings,
            vec![
                Value::from("paid"),
                Value::from("public"),
                Value::from(true),
                Value::String("admin,editor".to_string()),
                Value::I32(18),
                Value::from(true),
            ]
        );
    }
}
