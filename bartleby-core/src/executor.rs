//! Query execution and the connection capability
//!
//! The executor wraps a [`Connection`], drives one rendered statement
//! through prepare/execute, classifies the result by statement kind, and
//! captures timing. Driver failures never cross this boundary: they degrade
//! to [`Outcome::Failed`] after being logged and reported, and the builder
//! maps that to the caller's fallback value.

use std::time::{Duration, Instant};

use crate::error::DriverError;
use crate::value::Record;
use crate::{Error, Result, Value};

/// The minimal interface this engine requires from a database driver.
///
/// One statement at a time: the handle borrows the connection for the span
/// of a single prepare/execute cycle. Serializing access across callers is
/// the owner's concern; no locking happens here.
pub trait Connection {
    type Handle<'c>: StatementHandle
    where
        Self: 'c;

    /// Prepare a statement. May fail with a driver-level error.
    fn prepare(&mut self, sql: &str) -> std::result::Result<Self::Handle<'_>, DriverError>;

    /// The generated identifier of the most recent successful INSERT.
    fn last_insert_id(&mut self) -> String;

    /// Release the underlying connection.
    fn close(&mut self);
}

/// A prepared statement scoped to one execution cycle.
pub trait StatementHandle {
    /// Execute with positional values bound in order.
    fn execute(&mut self, params: &[Value]) -> std::result::Result<(), DriverError>;

    /// Drain the result cursor. Meaningful after executing a SELECT.
    fn fetch_rows(&mut self) -> std::result::Result<Vec<Record>, DriverError>;

    /// Rows touched by the most recent execute. Meaningful for mutations.
    fn rows_affected(&self) -> u64;
}

/// The recognized statement kinds, keyed off the leading SQL verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    Drop,
}

impl StatementKind {
    /// Classify a statement by its leading verb.
    ///
    /// An unrecognized verb is a hard error: it means the statement cannot
    /// be dispatched, which is a rendering defect rather than a runtime
    /// condition.
    pub fn classify(sql: &str) -> Result<Self> {
        let verb = sql
            .trim_start()
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match verb.as_str() {
            "select" => Ok(StatementKind::Select),
            "insert" => Ok(StatementKind::Insert),
            "update" => Ok(StatementKind::Update),
            "delete" => Ok(StatementKind::Delete),
            "truncate" => Ok(StatementKind::Truncate),
            "drop" => Ok(StatementKind::Drop),
            _ => Err(Error::query_type(sql)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Truncate => "truncate",
            StatementKind::Drop => "drop",
        }
    }
}

/// What one execution produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// SELECT: the materialized result rows
    Rows(Vec<Record>),
    /// INSERT: the generated identifier
    InsertId(String),
    /// Other verbs: the affected-row count
    Affected(u64),
    /// Driver failure, already logged and reported
    Failed { message: String },
}

/// Result shape for caller-supplied raw SQL, keyed off the sniffed verb.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    Rows(Vec<Record>),
    InsertId(String),
    Done(bool),
}

/// Observability record handed to the executor's report hook.
#[derive(Debug, Clone)]
pub struct QueryReport {
    pub sql: String,
    pub kind: StatementKind,
    pub elapsed: Duration,
    pub error: Option<String>,
}

/// One rendered statement plus its execution record.
///
/// Once run, the outcome is cached on the record itself: running the same
/// record again short-circuits to the cached outcome instead of
/// re-submitting to the connection.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    sql: String,
    bindings: Vec<Value>,
    kind: StatementKind,
    outcome: Option<Outcome>,
    elapsed: Option<Duration>,
}

impl PreparedQuery {
    /// Build a record from caller-supplied SQL, classifying the leading verb.
    pub fn new(sql: &str, bindings: Vec<Value>) -> Result<Self> {
        let kind = StatementKind::classify(sql)?;
        Ok(Self::with_kind(sql.to_string(), bindings, kind))
    }

    pub(crate) fn with_kind(sql: String, bindings: Vec<Value>, kind: StatementKind) -> Self {
        Self {
            sql,
            bindings,
            kind,
            outcome: None,
            elapsed: None,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
}

/// Wraps a [`Connection`] with timing, logging and fail-soft semantics.
pub struct Executor<C: Connection> {
    conn: C,
    verbose: bool,
    observer: Option<Box<dyn Fn(&QueryReport)>>,
}

impl<C: Connection> Executor<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            verbose: false,
            observer: None,
        }
    }

    /// Surface failure messages at error level instead of debug.
    ///
    /// The surrounding application decides when to turn this on; typically
    /// it mirrors a development-mode switch.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Register a hook that receives a [`QueryReport`] for every completed
    /// run, failures included.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&QueryReport) + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Direct access to the wrapped connection.
    pub fn connection(&mut self) -> &mut C {
        &mut self.conn
    }

    pub fn close(&mut self) {
        self.conn.close();
    }

    /// Run one statement record, returning its outcome.
    ///
    /// A record that already carries an outcome is not re-submitted.
    pub fn run(&mut self, query: &mut PreparedQuery) -> Outcome {
        if let Some(outcome) = &query.outcome {
            tracing::debug!(
                sql = %query.sql,
                "statement already executed, returning cached outcome"
            );
            return outcome.clone();
        }

        let started = Instant::now();
        let result = Self::submit(&mut self.conn, query);
        let elapsed = started.elapsed();
        query.elapsed = Some(elapsed);

        let outcome = match result {
            Ok(outcome) => {
                tracing::debug!(
                    sql = %query.sql,
                    kind = query.kind.as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "query executed"
                );
                self.notify(query, elapsed, None);
                outcome
            }
            Err(err) => {
                let message = err.message;
                if self.verbose {
                    tracing::error!(
                        sql = %query.sql,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %message,
                        "query failed"
                    );
                } else {
                    tracing::debug!(
                        sql = %query.sql,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %message,
                        "query failed"
                    );
                }
                self.notify(query, elapsed, Some(message.clone()));
                Outcome::Failed { message }
            }
        };

        query.outcome = Some(outcome.clone());
        outcome
    }

    fn submit(conn: &mut C, query: &PreparedQuery) -> std::result::Result<Outcome, DriverError> {
        let mut handle = conn.prepare(&query.sql)?;
        handle.execute(&query.bindings)?;
        match query.kind {
            StatementKind::Select => Ok(Outcome::Rows(handle.fetch_rows()?)),
            StatementKind::Insert => {
                drop(handle);
                Ok(Outcome::InsertId(conn.last_insert_id()))
            }
            _ => Ok(Outcome::Affected(handle.rows_affected())),
        }
    }

    fn notify(&self, query: &PreparedQuery, elapsed: Duration, error: Option<String>) {
        if let Some(observer) = &self.observer {
            observer(&QueryReport {
                sql: query.sql.clone(),
                kind: query.kind,
                elapsed,
                error,
            });
        }
    }
}

/// Bundled-SQLite implementation of the connection capability
#[cfg(feature = "sqlite")]
pub mod sqlite {
    use super::{Connection, StatementHandle};
    use crate::error::DriverError;
    use crate::value::Record;
    use crate::Value;
    use rusqlite::types::ValueRef;

    impl From<rusqlite::Error> for DriverError {
        fn from(err: rusqlite::Error) -> Self {
            DriverError::new(err.to_string())
        }
    }

    /// SQLite connection wrapper
    pub struct SqliteConnection {
        inner: rusqlite::Connection,
    }

    impl SqliteConnection {
        pub fn open(path: &str) -> Result<Self, DriverError> {
            Ok(Self {
                inner: rusqlite::Connection::open(path)?,
            })
        }

        pub fn open_in_memory() -> Result<Self, DriverError> {
            Ok(Self {
                inner: rusqlite::Connection::open_in_memory()?,
            })
        }

        /// Wrap an existing rusqlite connection
        pub fn from_connection(inner: rusqlite::Connection) -> Self {
            Self { inner }
        }
    }

    impl Connection for SqliteConnection {
        type Handle<'c>
            = SqliteStatement<'c>
        where
            Self: 'c;

        fn prepare(&mut self, sql: &str) -> Result<SqliteStatement<'_>, DriverError> {
            Ok(SqliteStatement {
                stmt: self.inner.prepare(sql)?,
                rows: Vec::new(),
                affected: 0,
            })
        }

        fn last_insert_id(&mut self) -> String {
            self.inner.last_insert_rowid().to_string()
        }

        fn close(&mut self) {
            // rusqlite closes on drop
        }
    }

    /// SQLite prepared statement
    pub struct SqliteStatement<'c> {
        stmt: rusqlite::Statement<'c>,
        rows: Vec<Record>,
        affected: u64,
    }

    impl StatementHandle for SqliteStatement<'_> {
        fn execute(&mut self, params: &[Value]) -> Result<(), DriverError> {
            let values: Vec<rusqlite::types::Value> = params.iter().map(to_sqlite_value).collect();
            if self.stmt.column_count() > 0 {
                let names: Vec<String> = self
                    .stmt
                    .column_names()
                    .iter()
                    .map(|name| name.to_string())
                    .collect();
                let mut out = Vec::new();
                {
                    let mut rows = self.stmt.query(rusqlite::params_from_iter(values))?;
                    while let Some(row) = rows.next()? {
                        let mut record = Record::new();
                        for (i, name) in names.iter().enumerate() {
                            record.insert(name.clone(), column_to_json(row.get_ref(i)?));
                        }
                        out.push(record);
                    }
                }
                self.rows = out;
            } else {
                self.affected = self.stmt.execute(rusqlite::params_from_iter(values))? as u64;
            }
            Ok(())
        }

        fn fetch_rows(&mut self) -> Result<Vec<Record>, DriverError> {
            Ok(std::mem::take(&mut self.rows))
        }

        fn rows_affected(&self) -> u64 {
            self.affected
        }
    }

    fn to_sqlite_value(value: &Value) -> rusqlite::types::Value {
        match value {
            Value::Null => rusqlite::types::Value::Null,
            Value::Bool(b) => rusqlite::types::Value::Integer(*b as i64),
            Value::I32(i) => rusqlite::types::Value::Integer(*i as i64),
            Value::I64(i) => rusqlite::types::Value::Integer(*i),
            Value::F32(f) => rusqlite::types::Value::Real(*f as f64),
            Value::F64(f) => rusqlite::types::Value::Real(*f),
            Value::String(s) => rusqlite::types::Value::Text(s.clone()),
            Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
            Value::Json(j) => rusqlite::types::Value::Text(j.to_string()),
        }
    }

    fn column_to_json(value: ValueRef<'_>) -> serde_json::Value {
        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(i) => serde_json::Value::Number(serde_json::Number::from(i)),
            ValueRef::Real(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => serde_json::Value::Array(
                b.iter()
                    .map(|byte| serde_json::Value::Number(serde_json::Number::from(*byte)))
                    .collect(),
            ),
        }
    }
}
