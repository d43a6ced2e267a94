//! Bartleby Core - a fluent SQL query builder and execution engine
//!
//! This crate provides a chainable builder for SELECT/INSERT/UPDATE/DELETE
//! statements, a grammar that renders accumulated state into parameterized
//! SQL plus an ordered binding list, and an execution adapter that drives a
//! statement through a minimal connection capability while degrading
//! failures to caller-supplied fallback values instead of propagating them.
//!
//! ```
//! use bartleby_core::{from, op};
//!
//! let mut query = from("users");
//! query
//!     .select(("id", "name"))
//!     .where_(("age", op::GT, 18))
//!     .or_where_group(|q| {
//!         q.where_(("role", "admin")).where_(("verified", true));
//!     })
//!     .order_by_desc("created_at")
//!     .limit(20);
//! ```

pub mod binding;
pub mod builder;
pub mod error;
pub mod executor;
pub mod grammar;
pub mod join;
pub mod operator;
pub mod paginator;
pub mod predicate;
pub mod value;

// Re-export main types
pub use binding::BindingStore;
pub use builder::conditions::IntoConditions;
pub use builder::joins::JoinOn;
pub use builder::payload::{Assign, IntoAssignments, IntoRows, Row};
pub use builder::{IntoColumns, QueryBuilder, SortDirection};
pub use error::{DriverError, Error, Result};
pub use executor::{
    Connection, Executor, Outcome, PreparedQuery, QueryReport, RawOutcome, StatementHandle,
    StatementKind,
};
pub use join::{JoinDescriptor, JoinType};
pub use operator::{op, IntoOperator, Operator};
pub use paginator::{Page, PageLink};
pub use predicate::{Connector, PredicateTree, WhereEntry};
pub use value::{Record, Value};

#[cfg(feature = "sqlite")]
pub use executor::sqlite::SqliteConnection;

/// Create a new query builder targeting the given table
pub fn from(table: &str) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.table(table);
    builder
}
