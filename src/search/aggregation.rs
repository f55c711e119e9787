//! Aggregation Planner
//!
//! Turns the ordered group-by list and the aggregate list into a nested tree
//! of bucketing and metric aggregations:
//!
//! ```text
//! group_by [year(ts), host]  aggregates [count(*), avg(latency)]
//!
//! year            date_histogram(ts, yyyy)
//! └── host        terms(host)
//!     └── _stats_latency   stats(latency)
//! ```
//!
//! Group-by order is nesting order. Metrics attach under the innermost level;
//! counts are read from bucket document counts where possible.

use serde_json::{json, Map, Value};

use crate::query::{
    AggregateTarget, AggregationFunc, GroupByClause, Query, QueryError, QueryResult,
    SortDirection, TimeGranularity,
};
use crate::search::clause::QueryExpr;

/// Largest bucket count or document window the backend serves in one request
pub const MAX_BUCKETS: u64 = 10_000;

/// Name prefix of per-field statistics aggregations
pub const STATS_PREFIX: &str = "_stats_";

/// Name of the statistics aggregation for a field
pub fn stats_name(field: &str) -> String {
    format!("{}{}", STATS_PREFIX, field)
}

/// One named aggregation and its sub-aggregations
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationNode {
    /// Name echoed back in the response
    pub name: String,
    /// What the aggregation computes
    pub kind: AggregationKind,
    /// Nested aggregations, computed per bucket
    pub children: Vec<AggregationNode>,
}

/// Aggregation kinds the planner emits
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    /// One bucket per distinct field value
    Terms {
        field: String,
        size: u64,
        order: BucketOrder,
    },
    /// One bucket per calendar unit
    DateHistogram {
        field: String,
        granularity: TimeGranularity,
        order: BucketOrder,
    },
    /// count/min/max/avg/sum of a numeric field
    Stats { field: String },
}

impl AggregationNode {
    /// Create a leaf statistics aggregation
    pub fn stats(field: &str) -> Self {
        Self {
            name: stats_name(field),
            kind: AggregationKind::Stats {
                field: field.to_string(),
            },
            children: Vec::new(),
        }
    }

    /// Create a terms aggregation
    pub fn terms(name: &str, field: &str, size: u64, order: BucketOrder) -> Self {
        Self {
            name: name.to_string(),
            kind: AggregationKind::Terms {
                field: field.to_string(),
                size,
                order,
            },
            children: Vec::new(),
        }
    }

    /// Bucketing aggregation for a group-by clause
    fn for_group(
        group: &GroupByClause,
        ordering: &OrderingDecision,
        children: Vec<AggregationNode>,
    ) -> Self {
        let kind = match group {
            GroupByClause::Field { field, .. } => AggregationKind::Terms {
                field: field.clone(),
                size: ordering.bucket_cap,
                order: ordering.bucket_order,
            },
            GroupByClause::TimeFunction {
                field, granularity, ..
            } => AggregationKind::DateHistogram {
                field: field.clone(),
                granularity: *granularity,
                order: ordering.bucket_order,
            },
        };

        Self {
            name: group.label().to_string(),
            kind,
            children,
        }
    }

    /// Render the aggregation body (without its name)
    pub fn to_json(&self) -> Value {
        let mut body = match &self.kind {
            AggregationKind::Terms { field, size, order } => json!({
                "terms": { "field": field, "size": size, "order": order.to_json() }
            }),
            AggregationKind::DateHistogram {
                field,
                granularity,
                order,
            } => {
                let mut histogram = Map::new();
                histogram.insert("field".to_string(), json!(field));
                match granularity {
                    // Seconds are not a calendar unit on the backend
                    TimeGranularity::Second => {
                        histogram.insert("fixed_interval".to_string(), json!("1s"));
                    }
                    other => {
                        histogram.insert("calendar_interval".to_string(), json!(other.to_string()));
                    }
                }
                histogram.insert("format".to_string(), json!(granularity.format_token()));
                histogram.insert("min_doc_count".to_string(), json!(1));
                histogram.insert("order".to_string(), order.to_json());
                json!({ "date_histogram": histogram })
            }
            AggregationKind::Stats { field } => json!({ "stats": { "field": field } }),
        };

        if !self.children.is_empty() {
            body["aggs"] = aggregations_to_json(&self.children);
        }
        body
    }
}

/// Render a list of aggregations as a name -> body object
pub fn aggregations_to_json(nodes: &[AggregationNode]) -> Value {
    let mut map = Map::new();
    for node in nodes {
        map.insert(node.name.clone(), node.to_json());
    }
    Value::Object(map)
}

/// Native bucket ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketOrder {
    /// Most documents first, ties by ascending key
    CountDescKeyAsc,
    /// By bucket key
    Key(SortDirection),
}

impl BucketOrder {
    /// Render as the backend's order array
    pub fn to_json(&self) -> Value {
        match self {
            Self::CountDescKeyAsc => json!([{ "_count": "desc" }, { "_key": "asc" }]),
            Self::Key(direction) => json!([{ "_key": direction.as_str() }]),
        }
    }
}

/// What the query's sort clauses target, as far as native ordering cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortTarget {
    /// No sort clauses
    Unsorted,
    /// A single clause on the only group level's key
    OwnKey(SortDirection),
    /// Anything else: aggregates, several clauses, other fields
    Other,
}

impl SortTarget {
    /// Classify the sort clauses of a query
    pub fn classify(query: &Query) -> Self {
        match (query.sort.as_slice(), query.group_by.as_slice()) {
            ([], _) => Self::Unsorted,
            ([sort], [group]) if sort.key == group.label() || sort.key == group.field() => {
                Self::OwnKey(sort.direction)
            }
            _ => Self::Other,
        }
    }
}

/// Native ordering vs client-side sorting for a bucketed query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingDecision {
    /// Order requested from the backend
    pub bucket_order: BucketOrder,
    /// Bucket count requested per terms level
    pub bucket_cap: u64,
    /// Whether the rows must be sorted after flattening
    pub client_sort: bool,
}

impl OrderingDecision {
    /// Decision table keyed on (group levels, sort target, offset presence)
    ///
    /// | levels | sort      | offset | order           | cap            | client sort |
    /// |--------|-----------|--------|-----------------|----------------|-------------|
    /// | 1      | none      | no     | count desc, key | limit or max   | no          |
    /// | 1      | own key   | no     | key asc/desc    | limit or max   | no          |
    /// | any    | otherwise | any    | count desc, key | max            | yes         |
    ///
    /// Zero levels produce at most one row, so nothing is sorted.
    pub fn decide(levels: usize, target: SortTarget, has_offset: bool, limit: Option<u64>) -> Self {
        let capped_limit = limit.map(|n| n.min(MAX_BUCKETS)).unwrap_or(MAX_BUCKETS);

        match (levels, target, has_offset) {
            (0, _, _) => Self {
                bucket_order: BucketOrder::CountDescKeyAsc,
                bucket_cap: MAX_BUCKETS,
                client_sort: false,
            },
            (1, SortTarget::Unsorted, false) => Self {
                bucket_order: BucketOrder::CountDescKeyAsc,
                bucket_cap: capped_limit,
                client_sort: false,
            },
            (1, SortTarget::OwnKey(direction), false) => Self {
                bucket_order: BucketOrder::Key(direction),
                bucket_cap: capped_limit,
                client_sort: false,
            },
            (_, target, _) => Self {
                bucket_order: BucketOrder::CountDescKeyAsc,
                bucket_cap: MAX_BUCKETS,
                client_sort: target != SortTarget::Unsorted,
            },
        }
    }
}

/// Everything the planner contributes to a request
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationPlan {
    /// Filters to AND with the where clause
    pub extra_filters: Vec<QueryExpr>,
    /// Top-level aggregations
    pub aggregations: Vec<AggregationNode>,
    /// Native ordering decision
    pub ordering: OrderingDecision,
    /// Whether a count is answered from the total hit count
    pub needs_total_hits: bool,
}

/// Plan the aggregations of a query
pub fn plan_aggregations(query: &Query) -> QueryResult<AggregationPlan> {
    let ordering = OrderingDecision::decide(
        query.group_by.len(),
        SortTarget::classify(query),
        query.effective_offset().is_some(),
        query.effective_limit(),
    );

    let mut extra_filters = Vec::new();
    let mut metrics: Vec<AggregationNode> = Vec::new();
    let mut needs_total_hits = false;

    for aggregate in &query.aggregates {
        match (aggregate.function, &aggregate.target) {
            (AggregationFunc::Count, AggregateTarget::AllDocuments) => {
                if query.group_by.is_empty() {
                    needs_total_hits = true;
                }
            }
            (AggregationFunc::Count, AggregateTarget::Field(field)) => {
                if query.group_by.is_empty() {
                    let filter = QueryExpr::exists(field);
                    if !extra_filters.contains(&filter) {
                        extra_filters.push(filter);
                    }
                    needs_total_hits = true;
                } else if query.group_label_for_field(field).is_none() {
                    push_stats(&mut metrics, field);
                }
            }
            (function, AggregateTarget::AllDocuments) => {
                return Err(QueryError::invalid(format!(
                    "{} of '{}' needs a field",
                    function, aggregate.label
                )));
            }
            (_, AggregateTarget::Field(field)) => push_stats(&mut metrics, field),
        }
    }

    // Innermost level first, wrapping outward
    let aggregations = query.group_by.iter().rev().fold(metrics, |children, group| {
        vec![AggregationNode::for_group(group, &ordering, children)]
    });

    Ok(AggregationPlan {
        extra_filters,
        aggregations,
        ordering,
        needs_total_hits,
    })
}

fn push_stats(metrics: &mut Vec<AggregationNode>, field: &str) {
    let name = stats_name(field);
    if !metrics.iter().any(|m| m.name == name) {
        metrics.push(AggregationNode::stats(field));
    }
}
