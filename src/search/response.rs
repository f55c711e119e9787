//! Backend response model
//!
//! Typed envelope for the `_search` response plus borrowed views over the
//! aggregation tree, which stays as raw JSON because its shape follows the
//! request.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Parsed `_search` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Backend processing time in milliseconds
    #[serde(default)]
    pub took: u64,
    /// Whether the backend gave up before finishing
    #[serde(default)]
    pub timed_out: bool,
    /// Cursor for the next page when scrolling
    #[serde(rename = "_scroll_id", default)]
    pub scroll_id: Option<String>,
    /// Matching documents
    #[serde(default)]
    pub hits: Hits,
    /// Named aggregation results
    #[serde(default)]
    pub aggregations: Map<String, Value>,
}

impl SearchResponse {
    /// Root scope of the aggregation tree
    pub fn aggregation_scope(&self) -> AggregationScope<'_> {
        AggregationScope::new(&self.aggregations)
    }
}

/// The `hits` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Total hit count, either a bare number or `{ "value": n, "relation": .. }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Tracked {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
}

impl Default for TotalHits {
    fn default() -> Self {
        Self::Count(0)
    }
}

impl TotalHits {
    /// The hit count
    pub fn value(&self) -> u64 {
        match self {
            Self::Count(n) => *n,
            Self::Tracked { value, .. } => *value,
        }
    }
}

/// One returned document
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    /// Backend-assigned identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Stored fields
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
}

/// A JSON object holding named aggregation results
///
/// Both the response root and every bucket are scopes: a bucket carries its
/// sub-aggregations next to `key` and `doc_count`.
#[derive(Debug, Clone, Copy)]
pub struct AggregationScope<'a> {
    results: &'a Map<String, Value>,
}

impl<'a> AggregationScope<'a> {
    pub fn new(results: &'a Map<String, Value>) -> Self {
        Self { results }
    }

    /// Buckets of a bucketing aggregation; empty when absent
    pub fn buckets(&self, name: &str) -> Vec<Bucket<'a>> {
        let Some(buckets) = self
            .results
            .get(name)
            .and_then(|agg| agg.get("buckets"))
            .and_then(Value::as_array)
        else {
            tracing::warn!(aggregation = name, "bucket aggregation absent from response");
            return Vec::new();
        };

        buckets
            .iter()
            .filter_map(Value::as_object)
            .map(|fields| Bucket { fields })
            .collect()
    }

    /// One value of a statistics aggregation; `None` when absent or null
    pub fn stat(&self, aggregation: &str, key: &str) -> Option<&'a Value> {
        self.results
            .get(aggregation)
            .and_then(|stats| stats.get(key))
            .filter(|v| !v.is_null())
    }
}

/// One bucket of a bucketing aggregation
#[derive(Debug, Clone, Copy)]
pub struct Bucket<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Bucket<'a> {
    /// Raw bucket key
    pub fn key(&self) -> &'a Value {
        self.fields.get("key").unwrap_or(&Value::Null)
    }

    /// Formatted key, if the backend supplied one
    pub fn key_as_string(&self) -> Option<&'a str> {
        self.fields.get("key_as_string").and_then(Value::as_str)
    }

    /// Number of documents in the bucket
    pub fn doc_count(&self) -> u64 {
        self.fields
            .get("doc_count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Sub-aggregation results of this bucket
    pub fn scope(&self) -> AggregationScope<'a> {
        AggregationScope::new(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_hits_both_shapes() {
        let legacy: SearchResponse =
            serde_json::from_value(json!({ "hits": { "total": 42, "hits": [] } })).unwrap();
        let tracked: SearchResponse = serde_json::from_value(
            json!({ "hits": { "total": { "value": 7, "relation": "eq" }, "hits": [] } }),
        )
        .unwrap();

        assert_eq!(legacy.hits.total.value(), 42);
        assert_eq!(tracked.hits.total.value(), 7);
    }

    #[test]
    fn test_empty_response_defaults() {
        let response: SearchResponse = serde_json::from_value(json!({})).unwrap();

        assert_eq!(response.hits.total.value(), 0);
        assert!(response.hits.hits.is_empty());
        assert!(response.aggregation_scope().buckets("anything").is_empty());
    }

    #[test]
    fn test_hits_keep_source_order() {
        let response: SearchResponse = serde_json::from_str(
            r#"{ "_scroll_id": "c1", "hits": { "total": 1, "hits": [
                { "_id": "a", "_source": { "zeta": 1, "alpha": 2 } }
            ] } }"#,
        )
        .unwrap();

        let keys: Vec<_> = response.hits.hits[0].source.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(response.scroll_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_bucket_views() {
        let response: SearchResponse = serde_json::from_value(json!({
            "aggregations": {
                "year": { "buckets": [
                    { "key": 1704067200000_i64, "key_as_string": "2024", "doc_count": 3,
                      "_stats_x": { "count": 3, "avg": 2.0, "min": null } }
                ] }
            }
        }))
        .unwrap();

        let buckets = response.aggregation_scope().buckets("year");
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key_as_string(), Some("2024"));
        assert_eq!(buckets[0].doc_count(), 3);

        let scope = buckets[0].scope();
        assert_eq!(scope.stat("_stats_x", "avg"), Some(&json!(2.0)));
        assert_eq!(scope.stat("_stats_x", "min"), None);
        assert_eq!(scope.stat("_stats_y", "avg"), None);
    }
}
