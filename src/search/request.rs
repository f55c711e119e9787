//! Request Assembler
//!
//! Combines the compiled filter, the aggregation plan, the projection and the
//! document window into one backend search request.
//!
//! # Window
//!
//! ```text
//! limit  offset   from   size          scroll
//! -      -        0      10000         -
//! 0      -        0      10000         -
//! 12     34       34     12            -
//! -      34       34     9966          -
//! 10^6   -        0      10000         1m
//! 12     9995     9995   5             -
//! ```

use serde_json::{json, Map, Value};

use crate::config::PathStyle;
use crate::query::{Query, QueryError, QueryResult, SortClause};
use crate::search::aggregation::{
    aggregations_to_json, plan_aggregations, AggregationNode, BucketOrder, MAX_BUCKETS,
};
use crate::search::clause::{compile_where, QueryExpr};
use crate::search::finish::FinishPlan;

/// Keep-alive requested when a result needs more than one page
pub const SCROLL_KEEP_ALIVE: &str = "1m";

/// Name of the aggregation serving distinct queries
pub const DISTINCT_AGG: &str = "distinct";

/// Database and table a request targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    pub database: String,
    pub table: String,
}

/// The `(from, size)` pair plus optional scroll keep-alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: u64,
    pub size: u64,
    pub scroll: Option<&'static str>,
}

impl Window {
    /// Compute the document window for a limit and offset
    ///
    /// A limit of 0 counts as unset. Limits past the backend ceiling request a
    /// scroll cursor. `from + size` never exceeds the ceiling; the size
    /// shrinks instead.
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        let from = offset.unwrap_or(0);
        let room = MAX_BUCKETS.saturating_sub(from);

        match limit.filter(|&n| n > 0) {
            Some(n) if n <= MAX_BUCKETS => Self {
                from,
                size: n.min(room),
                scroll: None,
            },
            Some(_) => Self {
                from,
                size: room,
                scroll: Some(SCROLL_KEEP_ALIVE),
            },
            None => Self {
                from,
                size: room,
                scroll: None,
            },
        }
    }
}

/// A compiled backend search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Target database/table
    pub target: SearchTarget,
    /// Document window
    pub window: Window,
    /// `_source` projection, if restricted
    pub source: Option<Vec<String>>,
    /// Native sort (plain queries only)
    pub sort: Vec<SortClause>,
    /// Ask the backend for an exact hit count
    pub track_total_hits: bool,
    /// Compiled filter
    pub query: QueryExpr,
    /// Top-level aggregations
    pub aggregations: Vec<AggregationNode>,
    /// What the Row Finisher still has to do
    pub finish: FinishPlan,
}

impl SearchRequest {
    /// Scroll keep-alive, if a cursor is requested
    pub fn scroll(&self) -> Option<&'static str> {
        self.window.scroll
    }

    /// Path segments of the search endpoint below the backend base URL
    pub fn path_segments(&self, style: PathStyle) -> Vec<&str> {
        match style {
            PathStyle::Typed => vec![
                self.target.database.as_str(),
                self.target.table.as_str(),
                "_search",
            ],
            PathStyle::Index => vec![self.target.table.as_str(), "_search"],
        }
    }

    /// Search endpoint path, e.g. `logs/events/_search`
    pub fn path(&self, style: PathStyle) -> String {
        self.path_segments(style).join("/")
    }

    /// Render the request body
    pub fn body(&self) -> Value {
        let mut body = Map::new();

        body.insert("explain".to_string(), json!(false));
        body.insert("from".to_string(), json!(self.window.from));
        body.insert("size".to_string(), json!(self.window.size));

        if let Some(source) = &self.source {
            body.insert("_source".to_string(), json!(source));
        }

        if !self.sort.is_empty() {
            let sort: Vec<Value> = self
                .sort
                .iter()
                .map(|s| json!({ s.key.as_str(): { "order": s.direction.as_str() } }))
                .collect();
            body.insert("sort".to_string(), Value::Array(sort));
        }

        if self.track_total_hits {
            body.insert("track_total_hits".to_string(), json!(true));
        }

        body.insert("query".to_string(), self.query.to_json());

        if !self.aggregations.is_empty() {
            body.insert("aggs".to_string(), aggregations_to_json(&self.aggregations));
        }

        Value::Object(body)
    }
}

/// Build the backend request for a query
pub fn build_request(query: &Query) -> QueryResult<SearchRequest> {
    let target = SearchTarget {
        database: query.database.clone(),
        table: query.table.clone(),
    };
    let window = Window::new(query.limit, query.offset);

    if query.distinct {
        return build_distinct(query, target, window);
    }

    let plan = plan_aggregations(query)?;
    let compiled = compile_where(query.where_clause.as_ref(), plan.extra_filters)?;

    let source = if query.fields.is_empty() {
        None
    } else {
        Some(query.fields.clone())
    };

    let (sort, finish) = if query.is_plain() {
        (query.sort.clone(), FinishPlan::pass_through())
    } else {
        (Vec::new(), FinishPlan::client_side(plan.ordering.client_sort))
    };

    Ok(SearchRequest {
        target,
        window,
        source,
        sort,
        track_total_hits: plan.needs_total_hits,
        query: compiled,
        aggregations: plan.aggregations,
        finish,
    })
}

fn build_distinct(
    query: &Query,
    target: SearchTarget,
    window: Window,
) -> QueryResult<SearchRequest> {
    let field = query
        .fields
        .first()
        .ok_or_else(|| QueryError::invalid("distinct needs at least one field"))?;

    let compiled = compile_where(query.where_clause.as_ref(), Vec::new())?;

    Ok(SearchRequest {
        target,
        window,
        source: Some(vec![field.clone()]),
        sort: Vec::new(),
        track_total_hits: false,
        query: compiled,
        aggregations: vec![AggregationNode::terms(
            DISTINCT_AGG,
            field,
            MAX_BUCKETS,
            BucketOrder::CountDescKeyAsc,
        )],
        finish: FinishPlan::client_side(!query.sort.is_empty()),
    })
}
