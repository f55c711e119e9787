//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{Query, QueryOptions};
use crate::search::Row;

// ============================================
// QUERY DTOs
// ============================================

/// Query request
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Logical query
    pub query: Query,
    /// Caller flags, logged with the query
    #[serde(default)]
    pub options: QueryOptions,
    /// Output format: json (default), ndjson or csv
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".to_string()
}

/// Query response (JSON format)
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Result rows, each an ordered field map
    pub rows: Vec<Row>,
    /// Query metadata
    pub meta: QueryMeta,
}

/// Query metadata
#[derive(Debug, Serialize)]
pub struct QueryMeta {
    /// Total hits reported by the backend
    pub total_hits: u64,
    /// Number of rows returned
    pub row_count: usize,
    /// Backend processing time
    pub took_ms: u64,
    /// End-to-end execution time
    pub execution_time_ms: u64,
    /// Scroll cursor, when the result continues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
}

/// Translate request
#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub query: Query,
}

/// Compiled backend request
#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    /// Search path below the backend URL
    pub path: String,
    /// Scroll keep-alive, if the request opens a cursor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll: Option<String>,
    /// Request body
    pub body: Value,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded
    pub status: String,
    /// Backend status: ok or unreachable
    pub backend: String,
    /// Backend location
    pub backend_url: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
