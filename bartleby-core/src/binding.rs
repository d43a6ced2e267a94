//! Ordered, named-bucket storage for pending parameter values
//!
//! Every placeholder a statement renders has a value staged here first. The
//! buckets exist so that flattening can follow the textual order placeholders
//! take in each statement kind, regardless of the order builder methods were
//! called in.

use crate::Value;

/// Pending parameter values, partitioned by the clause they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingStore {
    select: Vec<Value>,
    join: Vec<Value>,
    wheres: Vec<Value>,
    data: Vec<Value>,
}

impl BindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_select(&mut self, value: Value) {
        self.select.push(value);
    }

    pub fn push_join(&mut self, value: Value) {
        self.join.push(value);
    }

    pub fn push_where(&mut self, value: Value) {
        self.wheres.push(value);
    }

    pub fn push_data(&mut self, value: Value) {
        self.data.push(value);
    }

    pub fn extend_select(&mut self, values: impl IntoIterator<Item = Value>) {
        self.select.extend(values);
    }

    pub fn extend_join(&mut self, values: impl IntoIterator<Item = Value>) {
        self.join.extend(values);
    }

    pub fn extend_where(&mut self, values: impl IntoIterator<Item = Value>) {
        self.wheres.extend(values);
    }

    /// Append every bucket of `other` after the corresponding bucket here.
    pub fn merge(&mut self, other: BindingStore) {
        self.select.extend(other.select);
        self.join.extend(other.join);
        self.wheres.extend(other.wheres);
        self.data.extend(other.data);
    }

    /// Values staged for the WHERE bucket, in insertion order.
    pub fn where_values(self) -> Vec<Value> {
        self.wheres
    }

    pub fn is_empty(&self) -> bool {
        self.select.is_empty() && self.join.is_empty() && self.wheres.is_empty() && self.data.is_empty()
    }

    /// Positional list for a SELECT: column sub-selects, then join ON values,
    /// then where values.
    pub fn flatten_select(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.select.len() + self.join.len() + self.wheres.len());
        out.extend(self.select.iter().cloned());
        out.extend(self.join.iter().cloned());
        out.extend(self.wheres.iter().cloned());
        out
    }

    /// Positional list for a COUNT re-projection: join ON values and wheres.
    /// The select bucket is dropped along with the projection it belonged to.
    pub fn flatten_count(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.join.len() + self.wheres.len());
        out.extend(self.join.iter().cloned());
        out.extend(self.wheres.iter().cloned());
        out
    }

    /// Positional list for an INSERT: the row payload only.
    pub fn flatten_insert(&self) -> Vec<Value> {
        self.data.clone()
    }

    /// Positional list for an UPDATE: join ON values, SET payload, wheres.
    pub fn flatten_update(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.join.len() + self.data.len() + self.wheres.len());
        out.extend(self.join.iter().cloned());
        out.extend(self.data.iter().cloned());
        out.extend(self.wheres.iter().cloned());
        out
    }

    /// Positional list for a DELETE: join ON values, then wheres.
    pub fn flatten_delete(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.join.len() + self.wheres.len());
        out.extend(self.join.iter().cloned());
        out.extend(self.wheres.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_select_bucket_order() {
        let mut store = BindingStore::new();
        store.push_where(Value::I32(3));
        store.push_select(Value::I32(1));
        store.push_join(Value::I32(2));

        // Textual order in a SELECT is columns, joins, wheres - not the
        // order the values arrived in.
        assert_eq!(
            store.flatten_select(),
            vec![Value::I32(1), Value::I32(2), Value::I32(3)]
        );
    }

    #[test]
    fn test_flatten_update_puts_payload_before_wheres() {
        let mut store = BindingStore::new();
        store.push_where(Value::I32(9));
        store.push_data(Value::from("Jane"));

        assert_eq!(
            store.flatten_update(),
            vec![Value::from("Jane"), Value::I32(9)]
        );
    }

    #[test]
    fn test_merge_appends_per_bucket() {
        let mut parent = BindingStore::new();
        parent.push_where(Value::I32(1));

        let mut child = BindingStore::new();
        child.push_where(Value::I32(2));
        child.push_join(Value::I32(5));

        parent.merge(child);
        assert_eq!(parent.flatten_select(), vec![Value::I32(5), Value::I32(1), Value::I32(2)]);
    }

    #[test]
    fn test_empty_store() {
        let store = BindingStore::new();
        assert!(store.is_empty());
        assert!(store.flatten_select().is_empty());
        assert!(store.flatten_insert().is_empty());
    }
}
