//! Logical Query Model
//!
//! The backend-agnostic query description the middleware hands to every
//! datastore adapter:
//!
//! - **AST**: query, filter tree, aggregate, group-by and sort clauses
//! - **Errors**: everything that can go wrong between a query and its rows
//!
//! # Examples
//!
//! ```rust
//! use searchbridge::query::{AggregationFunc, Query, SortDirection, TimeGranularity};
//!
//! let query = Query::from_table("telemetry", "events")
//!     .group_by_time("ts", "year", TimeGranularity::Year)
//!     .group_by("host", "host")
//!     .count_all("total")
//!     .aggregate("avg_latency", AggregationFunc::Avg, "latency")
//!     .sort("total", SortDirection::Desc)
//!     .limit(10)
//!     .build();
//!
//! assert!(query.is_aggregate());
//! ```

mod ast;
mod error;

pub use ast::{
    AggregateClause, AggregateTarget, AggregationFunc, FilterValue, GroupByClause, Operator,
    Query, QueryBuilder, QueryOptions, SortClause, SortDirection, TimeGranularity, WhereClause,
    ALL_DOCUMENTS,
};
pub use error::{QueryError, QueryResult};
