//! Insert and update payload conversions

use std::collections::{BTreeMap, HashMap};

use crate::Value;

/// One insert row: ordered column/value pairs.
pub type Row = Vec<(String, Value)>;

/// A single SET assignment target.
///
/// `Raw` splices its text into the statement unescaped and contributes no
/// binding; everything else goes through a placeholder. The two cases are an
/// explicit tagged choice at the API boundary rather than a pattern sniffed
/// out of the value at render time.
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    Value(Value),
    Raw(String),
}

impl Assign {
    pub fn value(v: impl Into<Value>) -> Self {
        Assign::Value(v.into())
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Assign::Raw(sql.into())
    }
}

/// Trait for types that can be converted to one or more INSERT rows.
///
/// Multi-row detection is structural: a list of row-shaped values is a batch,
/// a single row-shaped value is a one-row insert.
pub trait IntoRows {
    fn into_rows(self) -> Vec<Row>;
}

impl<V: Into<Value>> IntoRows for Vec<(&str, V)> {
    fn into_rows(self) -> Vec<Row> {
        vec![self
            .into_iter()
            .map(|(c, v)| (c.to_string(), v.into()))
            .collect()]
    }
}

impl<V: Into<Value>> IntoRows for Vec<Vec<(&str, V)>> {
    fn into_rows(self) -> Vec<Row> {
        self.into_iter()
            .map(|row| row.into_iter().map(|(c, v)| (c.to_string(), v.into())).collect())
            .collect()
    }
}

impl IntoRows for HashMap<String, Value> {
    fn into_rows(self) -> Vec<Row> {
        vec![self.into_iter().collect()]
    }
}

impl IntoRows for Vec<HashMap<String, Value>> {
    fn into_rows(self) -> Vec<Row> {
        self.into_iter().map(|row| row.into_iter().collect()).collect()
    }
}

impl IntoRows for BTreeMap<String, Value> {
    fn into_rows(self) -> Vec<Row> {
        vec![self.into_iter().collect()]
    }
}

impl IntoRows for Vec<BTreeMap<String, Value>> {
    fn into_rows(self) -> Vec<Row> {
        self.into_iter().map(|row| row.into_iter().collect()).collect()
    }
}

/// Trait for types that can be converted to UPDATE assignments
pub trait IntoAssignments {
    fn into_assignments(self) -> Vec<(String, Assign)>;
}

impl IntoAssignments for Vec<(String, Assign)> {
    fn into_assignments(self) -> Vec<(String, Assign)> {
        self
    }
}

impl IntoAssignments for Vec<(&str, Assign)> {
    fn into_assignments(self) -> Vec<(String, Assign)> {
        self.into_iter().map(|(c, a)| (c.to_string(), a)).collect()
    }
}

impl IntoAssignments for Vec<(&str, Value)> {
    fn into_assignments(self) -> Vec<(String, Assign)> {
        self.into_iter()
            .map(|(c, v)| (c.to_string(), Assign::Value(v)))
            .collect()
    }
}

impl IntoAssignments for HashMap<String, Value> {
    fn into_assignments(self) -> Vec<(String, Assign)> {
        self.into_iter().map(|(c, v)| (c, Assign::Value(v))).collect()
    }
}

impl IntoAssignments for BTreeMap<String, Value> {
    fn into_assignments(self) -> Vec<(String, Assign)> {
        self.into_iter().map(|(c, v)| (c, Assign::Value(v))).collect()
    }
}

/// Normalize a row batch: the first row fixes the column set and order;
/// later rows are re-ordered to match, with missing cells bound as NULL.
pub(crate) fn normalize_rows(rows: Vec<Row>) -> (Vec<String>, Vec<Vec<Value>>) {
    let Some(first) = rows.first() else {
        return (Vec::new(), Vec::new());
    };
    let columns: Vec<String> = first.iter().map(|(c, _)| c.clone()).collect();

    let values = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| {
                    row.iter()
                        .find(|(c, _)| c == col)
                        .map(|(_, v)| v.clone())
                        .unwrap_or(Value::Null)
                })
                .collect()
        })
        .collect();

    (columns, values)
}
