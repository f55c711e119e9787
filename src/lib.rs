//! # searchbridge
//!
//! Search-engine backend adapter: compiles logical queries (filters, grouped
//! aggregates, sort, limit, offset) into bucketed `_search` requests and
//! flattens the responses back into ordered rows.
//!
//! ## Features
//!
//! - **Clause compilation**: nested AND/OR filter trees to boolean queries
//! - **Aggregation planning**: nested terms and date-histogram buckets with
//!   shared statistics per field
//! - **Native ordering**: bucket order and caps pushed down when one level
//!   and one key allow it, client-side sorting otherwise
//! - **Windowing**: `from`/`size` with scroll cursors past the bucket ceiling
//!
//! ## Modules
//!
//! - [`query`]: Logical query model
//! - [`search`]: Compiler, transport and row pipeline
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use searchbridge::config::BackendConfig;
//! use searchbridge::query::{AggregationFunc, Query, QueryOptions, SortDirection};
//! use searchbridge::search::{HttpTransport, SearchAdapter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new(&BackendConfig::default())?;
//!     let adapter = SearchAdapter::new(Arc::new(transport));
//!
//!     let query = Query::from_table("logs", "requests")
//!         .group_by("host", "host")
//!         .count_all("requests")
//!         .aggregate("p_latency", AggregationFunc::Avg, "latency_ms")
//!         .sort("requests", SortDirection::Desc)
//!         .limit(10)
//!         .build();
//!
//!     let result = adapter.execute(&query, &QueryOptions::default()).await?;
//!     for row in &result.rows {
//!         println!("{}", serde_json::to_string(row)?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod query;
pub mod search;

// Re-export top-level types for convenience
pub use query::{
    AggregateClause, AggregationFunc, GroupByClause, Query, QueryError, QueryOptions,
    QueryResult, SortClause, SortDirection, WhereClause,
};

pub use search::{
    ResultSet, Row, SearchAdapter, SearchRequest, SearchTransport, TransportError,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, BackendConfig, Config, ConfigError, LoggingConfig, PathStyle};
