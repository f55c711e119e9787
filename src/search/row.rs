//! Result rows
//!
//! A row is an insertion-ordered field -> value map. Group labels come first
//! in clause order, then aggregate labels; plain documents keep their stored
//! field order followed by [`ID_FIELD`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved field carrying the backend document identifier
pub const ID_FIELD: &str = "_id";

/// A single result row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: IndexMap<String, Value>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, or replace it in place if present
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Builder-style [`Row::insert`]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Get a value by field name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether the row has the field
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Field names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insertion_order_preserved() {
        let row = Row::new().with("zeta", 1).with("alpha", "a").with(ID_FIELD, "doc-1");

        let columns: Vec<_> = row.columns().collect();
        assert_eq!(columns, vec!["zeta", "alpha", "_id"]);
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"zeta":1,"alpha":"a","_id":"doc-1"}"#
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut row = Row::new().with("a", 1).with("b", 2);
        row.insert("a", json!(3));

        assert_eq!(row.get("a"), Some(&json!(3)));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
