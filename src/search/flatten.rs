//! Bucket Flattener
//!
//! Turns a backend response into rows. Nested bucket levels are walked
//! depth-first and every leaf combination becomes one row holding the group
//! labels in clause order followed by the aggregate labels.

use serde_json::Value;

use crate::query::{AggregateClause, AggregateTarget, AggregationFunc, GroupByClause, Query};
use crate::search::aggregation::stats_name;
use crate::search::request::DISTINCT_AGG;
use crate::search::response::{AggregationScope, Bucket, SearchResponse};
use crate::search::row::{Row, ID_FIELD};

/// Flatten a response into rows for the query that produced it
pub fn flatten_response(query: &Query, response: &SearchResponse) -> Vec<Row> {
    if query.is_plain() {
        flatten_hits(response)
    } else if query.distinct {
        flatten_distinct(query, response)
    } else if query.group_by.is_empty() {
        vec![flatten_totals(query, response)]
    } else {
        let mut rows = Vec::new();
        let mut path = Vec::with_capacity(query.group_by.len());
        flatten_level(query, 0, response.aggregation_scope(), &mut path, &mut rows);
        rows
    }
}

fn flatten_hits(response: &SearchResponse) -> Vec<Row> {
    response
        .hits
        .hits
        .iter()
        .map(|hit| {
            let mut row: Row = hit
                .source
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            row.insert(ID_FIELD, hit.id.clone());
            row
        })
        .collect()
}

fn flatten_distinct(query: &Query, response: &SearchResponse) -> Vec<Row> {
    let Some(field) = query.fields.first() else {
        return Vec::new();
    };

    response
        .aggregation_scope()
        .buckets(DISTINCT_AGG)
        .into_iter()
        .map(|bucket| Row::new().with(field.as_str(), field_key(&bucket)))
        .collect()
}

fn flatten_totals(query: &Query, response: &SearchResponse) -> Row {
    let scope = response.aggregation_scope();
    let total = response.hits.total.value();

    query
        .aggregates
        .iter()
        .map(|aggregate| {
            let value = match aggregate.function {
                AggregationFunc::Count => Value::from(total),
                _ => metric_value(aggregate, &scope),
            };
            (aggregate.label.clone(), value)
        })
        .collect()
}

/// Group key and document count of one bucket on the current path
struct PathEntry {
    key: Value,
    doc_count: u64,
}

fn flatten_level(
    query: &Query,
    depth: usize,
    scope: AggregationScope<'_>,
    path: &mut Vec<PathEntry>,
    rows: &mut Vec<Row>,
) {
    let group = &query.group_by[depth];

    for bucket in scope.buckets(group.label()) {
        path.push(PathEntry {
            key: group_key(group, &bucket),
            doc_count: bucket.doc_count(),
        });

        if depth + 1 == query.group_by.len() {
            rows.push(leaf_row(query, path, &bucket.scope()));
        } else {
            flatten_level(query, depth + 1, bucket.scope(), path, rows);
        }

        path.pop();
    }
}

fn leaf_row(query: &Query, path: &[PathEntry], scope: &AggregationScope<'_>) -> Row {
    let mut row = Row::new();

    for (group, entry) in query.group_by.iter().zip(path) {
        row.insert(group.label(), entry.key.clone());
    }

    for aggregate in &query.aggregates {
        let value = match (aggregate.function, &aggregate.target) {
            (AggregationFunc::Count, AggregateTarget::AllDocuments) => {
                Value::from(path.last().map_or(0, |entry| entry.doc_count))
            }
            (AggregationFunc::Count, AggregateTarget::Field(field)) => {
                // Innermost level grouped on the field, else the stats count
                match query.group_by.iter().rposition(|g| g.field() == field) {
                    Some(level) => Value::from(path[level].doc_count),
                    None => metric_value(aggregate, scope),
                }
            }
            _ => metric_value(aggregate, scope),
        };
        row.insert(aggregate.label.as_str(), value);
    }

    row
}

fn group_key(group: &GroupByClause, bucket: &Bucket<'_>) -> Value {
    match group {
        GroupByClause::Field { .. } => field_key(bucket),
        GroupByClause::TimeFunction { granularity, .. } => bucket
            .key_as_string()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .or_else(|| {
                bucket
                    .key()
                    .as_i64()
                    .and_then(|ms| granularity.component(ms))
            })
            .map_or(Value::Null, Value::from),
    }
}

/// Terms keys keep their JSON type; boolean fields come back as 0/1 with a
/// `"true"`/`"false"` key string.
fn field_key(bucket: &Bucket<'_>) -> Value {
    match (bucket.key(), bucket.key_as_string()) {
        (Value::Number(_), Some("true")) => Value::Bool(true),
        (Value::Number(_), Some("false")) => Value::Bool(false),
        (key, _) => key.clone(),
    }
}

fn metric_value(aggregate: &AggregateClause, scope: &AggregationScope<'_>) -> Value {
    let stat = aggregate
        .target
        .field()
        .and_then(|field| scope.stat(&stats_name(field), aggregate.function.stats_key()));

    match (stat, aggregate.function) {
        (Some(value), _) => value.clone(),
        (None, AggregationFunc::Count | AggregationFunc::Sum) => Value::from(0),
        (None, _) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TimeGranularity;
    use serde_json::json;

    fn response(value: Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_hits_in_order_with_id() {
        let query = Query::from_table("db", "t").build();
        let response = response(json!({
            "hits": { "total": 2, "hits": [
                { "_id": "b", "_source": { "host": "web-2", "latency": 12 } },
                { "_id": "a", "_source": { "host": "web-1", "latency": 7 } }
            ] }
        }));

        let rows = flatten_response(&query, &response);

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            Row::new().with("host", "web-2").with("latency", 12).with("_id", "b")
        );
        assert_eq!(rows[1].get("_id"), Some(&json!("a")));
    }

    #[test]
    fn test_distinct_rows_hold_only_the_field() {
        let query = Query::from_table("db", "t")
            .fields(&["host", "status"])
            .distinct()
            .build();
        let response = response(json!({
            "hits": { "total": 9, "hits": [] },
            "aggregations": { "distinct": { "buckets": [
                { "key": "web-1", "doc_count": 5 },
                { "key": "web-2", "doc_count": 4 }
            ] } }
        }));

        let rows = flatten_response(&query, &response);

        assert_eq!(
            rows,
            vec![Row::new().with("host", "web-1"), Row::new().with("host", "web-2")]
        );
    }

    #[test]
    fn test_distinct_boolean_keys_stay_boolean() {
        let query = Query::from_table("db", "t").fields(&["active"]).distinct().build();
        let response = response(json!({
            "hits": { "total": 7, "hits": [] },
            "aggregations": { "distinct": { "buckets": [
                { "key": 1, "key_as_string": "true", "doc_count": 5 },
                { "key": 0, "key_as_string": "false", "doc_count": 2 }
            ] } }
        }));

        let rows = flatten_response(&query, &response);

        assert_eq!(rows[0].get("active"), Some(&Value::Bool(true)));
        assert_eq!(rows[1].get("active"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_totals_row_without_groups() {
        let query = Query::from_table("db", "t")
            .count_all("n")
            .aggregate("mean", AggregationFunc::Avg, "latency")
            .aggregate("total", AggregationFunc::Sum, "bytes")
            .aggregate("lowest", AggregationFunc::Min, "bytes")
            .build();
        let response = response(json!({
            "hits": { "total": { "value": 40, "relation": "eq" }, "hits": [] },
            "aggregations": { "_stats_latency": { "count": 40, "avg": 12.5 } }
        }));

        let rows = flatten_response(&query, &response);

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            Row::new()
                .with("n", 40)
                .with("mean", 12.5)
                .with("total", 0)
                .with("lowest", Value::Null)
        );
    }

    #[test]
    fn test_two_levels_flatten_cartesian() {
        let query = Query::from_table("db", "t")
            .group_by("host", "host")
            .group_by_time("ts", "year", TimeGranularity::Year)
            .count_all("n")
            .aggregate("mean", AggregationFunc::Avg, "latency")
            .build();
        let response = response(json!({
            "aggregations": { "host": { "buckets": [
                { "key": "web-1", "doc_count": 5, "year": { "buckets": [
                    { "key": 1672531200000_i64, "key_as_string": "2023", "doc_count": 2,
                      "_stats_latency": { "avg": 1.0 } },
                    { "key": 1704067200000_i64, "key_as_string": "2024", "doc_count": 3,
                      "_stats_latency": { "avg": 2.0 } }
                ] } },
                { "key": "web-2", "doc_count": 4, "year": { "buckets": [
                    { "key": 1672531200000_i64, "key_as_string": "2023", "doc_count": 1,
                      "_stats_latency": { "avg": 3.0 } },
                    { "key": 1704067200000_i64, "key_as_string": "2024", "doc_count": 3,
                      "_stats_latency": { "avg": 4.0 } }
                ] } }
            ] } }
        }));

        let rows = flatten_response(&query, &response);

        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            Row::new().with("host", "web-1").with("year", 2023).with("n", 2).with("mean", 1.0)
        );
        assert_eq!(
            rows[3],
            Row::new().with("host", "web-2").with("year", 2024).with("n", 3).with("mean", 4.0)
        );
        assert_eq!(rows[2].columns().collect::<Vec<_>>(), vec!["host", "year", "n", "mean"]);
    }

    #[test]
    fn test_count_on_outer_group_field_uses_outer_doc_count() {
        let query = Query::from_table("db", "t")
            .group_by("host", "h")
            .group_by("status", "s")
            .aggregate("hosts", AggregationFunc::Count, "host")
            .aggregate("bytes", AggregationFunc::Count, "bytes")
            .build();
        let response = response(json!({
            "aggregations": { "h": { "buckets": [
                { "key": "web-1", "doc_count": 7, "s": { "buckets": [
                    { "key": "ok", "doc_count": 6, "_stats_bytes": { "count": 4 } }
                ] } }
            ] } }
        }));

        let rows = flatten_response(&query, &response);

        assert_eq!(rows[0].get("hosts"), Some(&json!(7)));
        assert_eq!(rows[0].get("bytes"), Some(&json!(4)));
    }

    #[test]
    fn test_time_key_falls_back_to_epoch_millis() {
        let query = Query::from_table("db", "t")
            .group_by_time("ts", "month", TimeGranularity::Month)
            .build();
        let response = response(json!({
            "aggregations": { "month": { "buckets": [
                { "key": 1709251200000_i64, "doc_count": 1 }
            ] } }
        }));

        let rows = flatten_response(&query, &response);

        assert_eq!(rows, vec![Row::new().with("month", 3)]);
    }

    #[test]
    fn test_boolean_terms_keys() {
        let query = Query::from_table("db", "t")
            .group_by("active", "active")
            .count_all("n")
            .build();
        let response = response(json!({
            "aggregations": { "active": { "buckets": [
                { "key": 1, "key_as_string": "true", "doc_count": 3 },
                { "key": 0, "key_as_string": "false", "doc_count": 1 }
            ] } }
        }));

        let rows = flatten_response(&query, &response);

        assert_eq!(rows[0].get("active"), Some(&json!(true)));
        assert_eq!(rows[1].get("active"), Some(&json!(false)));
    }

    #[test]
    fn test_missing_aggregation_yields_no_rows() {
        let query = Query::from_table("db", "t").group_by("host", "host").count_all("n").build();
        let rows = flatten_response(&query, &response(json!({})));
        assert!(rows.is_empty());
    }
}
