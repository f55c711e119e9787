//! Row Finisher
//!
//! Client-side sorting and paging for results whose ordering could not be
//! expressed natively in the backend request.

use std::cmp::Ordering;

use serde_json::Value;

use crate::query::{Query, SortDirection};
use crate::search::row::Row;

/// What remains to be done to the rows after flattening
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishPlan {
    /// Sort rows by the query's sort clauses
    pub client_sort: bool,
    /// Apply the query's offset and limit to the rows
    pub client_page: bool,
}

impl FinishPlan {
    /// The backend already sorted and windowed the rows
    pub fn pass_through() -> Self {
        Self {
            client_sort: false,
            client_page: false,
        }
    }

    /// Rows come from buckets, so paging is always local
    pub fn client_side(sort: bool) -> Self {
        Self {
            client_sort: sort,
            client_page: true,
        }
    }
}

/// Sort and page rows according to the query and plan
pub fn finish_rows(mut rows: Vec<Row>, query: &Query, plan: &FinishPlan) -> Vec<Row> {
    if plan.client_sort && !query.sort.is_empty() {
        let keys: Vec<(String, SortDirection)> = query
            .sort
            .iter()
            .map(|clause| (resolve_key(&rows, query, &clause.key), clause.direction))
            .collect();

        // Vec::sort_by is stable: equal rows keep flattening order
        rows.sort_by(|a, b| {
            keys.iter()
                .map(|(key, direction)| compare_values(a.get(key), b.get(key), *direction))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    if !plan.client_page {
        return rows;
    }

    let offset = query.effective_offset().unwrap_or(0) as usize;
    match query.effective_limit() {
        Some(limit) => rows.into_iter().skip(offset).take(limit as usize).collect(),
        None => rows.into_iter().skip(offset).collect(),
    }
}

/// A sort key names a row field, or a group-by source field shown under its label
fn resolve_key(rows: &[Row], query: &Query, key: &str) -> String {
    if rows.iter().any(|row| row.contains(key)) {
        return key.to_string();
    }

    query
        .group_label_for_field(key)
        .unwrap_or(key)
        .to_string()
}

/// Nulls and missing values sort last in either direction
fn compare_values(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare_present(a, b);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counted_rows() -> Vec<Row> {
        [("c", 21), ("d", 43), ("a", 65), ("b", 87)]
            .into_iter()
            .map(|(key, count)| Row::new().with("key", key).with("count", count))
            .collect()
    }

    fn keys(rows: &[Row]) -> Vec<&str> {
        rows.iter()
            .map(|r| r.get("key").and_then(Value::as_str).unwrap())
            .collect()
    }

    #[test]
    fn test_sort_by_count_with_limit() {
        let query = Query::from_table("db", "t")
            .sort("count", SortDirection::Asc)
            .limit(2)
            .build();

        let rows = finish_rows(counted_rows(), &query, &FinishPlan::client_side(true));

        assert_eq!(
            rows,
            vec![
                Row::new().with("key", "c").with("count", 21),
                Row::new().with("key", "d").with("count", 43),
            ]
        );
    }

    #[test]
    fn test_sort_by_key_with_limit_and_offset() {
        let query = Query::from_table("db", "t")
            .sort("key", SortDirection::Asc)
            .limit(2)
            .offset(1)
            .build();

        let rows = finish_rows(counted_rows(), &query, &FinishPlan::client_side(true));

        assert_eq!(keys(&rows), vec!["b", "c"]);
        assert_eq!(rows[0].get("count"), Some(&json!(87)));
    }

    #[test]
    fn test_descending_keeps_nulls_last() {
        let rows = vec![
            Row::new().with("key", "x").with("v", Value::Null),
            Row::new().with("key", "y").with("v", 1),
            Row::new().with("key", "z").with("v", 5),
        ];
        let query = Query::from_table("db", "t").sort("v", SortDirection::Desc).build();

        let rows = finish_rows(rows, &query, &FinishPlan::client_side(true));

        assert_eq!(keys(&rows), vec!["z", "y", "x"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let rows = vec![
            Row::new().with("key", "first").with("v", 1),
            Row::new().with("key", "second").with("v", 0),
            Row::new().with("key", "third").with("v", 1),
        ];
        let query = Query::from_table("db", "t").sort("v", SortDirection::Desc).build();

        let rows = finish_rows(rows, &query, &FinishPlan::client_side(true));

        assert_eq!(keys(&rows), vec!["first", "third", "second"]);
    }

    #[test]
    fn test_mixed_types_order() {
        let rows = vec![
            Row::new().with("key", "s").with("v", "text"),
            Row::new().with("key", "n").with("v", 3),
            Row::new().with("key", "b").with("v", true),
        ];
        let query = Query::from_table("db", "t").sort("v", SortDirection::Asc).build();

        let rows = finish_rows(rows, &query, &FinishPlan::client_side(true));

        assert_eq!(keys(&rows), vec!["b", "n", "s"]);
    }

    #[test]
    fn test_sort_key_resolved_through_group_label() {
        let rows = vec![
            Row::new().with("key", "late").with("h", "web-2"),
            Row::new().with("key", "early").with("h", "web-1"),
        ];
        let query = Query::from_table("db", "t")
            .group_by("host", "h")
            .sort("host", SortDirection::Asc)
            .build();

        let rows = finish_rows(rows, &query, &FinishPlan::client_side(true));

        assert_eq!(keys(&rows), vec!["early", "late"]);
    }

    #[test]
    fn test_pass_through_leaves_rows_alone() {
        let query = Query::from_table("db", "t")
            .sort("count", SortDirection::Asc)
            .limit(1)
            .offset(1)
            .build();

        let rows = finish_rows(counted_rows(), &query, &FinishPlan::pass_through());

        assert_eq!(keys(&rows), vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        let query = Query::from_table("db", "t").limit(0).offset(3).build();

        let rows = finish_rows(counted_rows(), &query, &FinishPlan::client_side(false));

        assert_eq!(keys(&rows), vec!["b"]);
    }
}
