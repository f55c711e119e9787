//! Query Routes
//!
//! - POST /api/v1/query - Execute a query
//! - POST /api/v1/query/translate - Compile a query without running it

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{QueryMeta, QueryRequest, QueryResponse, TranslateRequest, TranslateResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::search::{export, OutputFormat, ResultSet};

/// POST /api/v1/query
///
/// Execute a query and return results.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> ApiResult<Response> {
    let format = OutputFormat::from_str(&req.format).ok_or_else(|| {
        ApiError::Validation(format!(
            "Invalid format: {}. Use json, ndjson or csv",
            req.format
        ))
    })?;

    let result = state.adapter.execute(&req.query, &req.options).await?;

    match format {
        OutputFormat::Json => Ok(format_json_response(result)),
        other => {
            let body = export::render(&result.rows, other)?;
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, other.content_type())],
                body,
            )
                .into_response())
        }
    }
}

/// POST /api/v1/query/translate
///
/// Return the compiled backend request.
pub async fn translate_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranslateRequest>,
) -> ApiResult<Json<TranslateResponse>> {
    let request = state.adapter.translate(&req.query)?;

    Ok(Json(TranslateResponse {
        path: request.path(state.path_style),
        scroll: request.scroll().map(str::to_string),
        body: request.body(),
    }))
}

fn format_json_response(result: ResultSet) -> Response {
    let meta = QueryMeta {
        total_hits: result.total_hits,
        row_count: result.rows.len(),
        took_ms: result.took_ms,
        execution_time_ms: result.execution_time_ms,
        scroll_id: result.scroll_id,
    };

    let response = QueryResponse {
        rows: result.rows,
        meta,
    };

    (StatusCode::OK, Json(response)).into_response()
}
