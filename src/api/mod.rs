//! searchbridge REST API
//!
//! HTTP API layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Query
//! - `POST /api/v1/query` - Execute a query
//! - `POST /api/v1/query/translate` - Show the compiled backend request
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use searchbridge::api::{serve, AppState};
//! use searchbridge::config::Config;
//! use searchbridge::search::{HttpTransport, SearchAdapter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let transport = HttpTransport::new(&config.backend)?;
//!     let adapter = SearchAdapter::new(Arc::new(transport));
//!
//!     let state = AppState::new(adapter, config.api.clone(), config.backend.path_style);
//!     serve(state, &config.api).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/query", post(routes::query::execute_query))
        .route("/query/translate", post(routes::query::translate_query));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config);
    let timeout = TimeoutLayer::new(Duration::from_secs(state.config.request_timeout_secs));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// No configured origins means any origin
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let backend = state.adapter.endpoint();
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("searchbridge API listening on {} (backend {})", addr, backend);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("searchbridge API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathStyle;
    use crate::search::{SearchAdapter, StaticTransport};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn create_test_app(response: Value) -> Router {
        let transport = Arc::new(StaticTransport::new(response));
        let state = AppState::new(
            SearchAdapter::new(transport),
            ApiConfig::default(),
            PathStyle::Typed,
        );
        build_router(state)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn buckets() -> Value {
        json!({
            "took": 5,
            "hits": { "total": 150, "hits": [] },
            "aggregations": { "host": { "buckets": [
                { "key": "web-1", "doc_count": 100 },
                { "key": "web-2", "doc_count": 50 }
            ] } }
        })
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app(json!({}));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let app = create_test_app(json!({}));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend_url"], "static");
    }

    #[tokio::test]
    async fn test_query_rows_and_meta() {
        let app = create_test_app(buckets());
        let request = post_json(
            "/api/v1/query",
            json!({
                "query": {
                    "database": "db",
                    "table": "requests",
                    "group_by": [ { "type": "field", "field": "host", "label": "host" } ],
                    "aggregates": [ { "label": "n", "function": "count", "field": "*" } ]
                }
            }),
        );

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["rows"],
            json!([ { "host": "web-1", "n": 100 }, { "host": "web-2", "n": 50 } ])
        );
        assert_eq!(body["meta"]["row_count"], 2);
        assert_eq!(body["meta"]["total_hits"], 150);
        assert_eq!(body["meta"]["took_ms"], 5);
    }

    #[tokio::test]
    async fn test_query_csv_format() {
        let app = create_test_app(buckets());
        let request = post_json(
            "/api/v1/query",
            json!({
                "query": {
                    "database": "db",
                    "table": "requests",
                    "group_by": [ { "type": "field", "field": "host", "label": "host" } ],
                    "aggregates": [ { "label": "n", "function": "count", "field": "*" } ]
                },
                "format": "csv"
            }),
        );

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/csv");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"host,n\nweb-1,100\nweb-2,50\n");
    }

    #[tokio::test]
    async fn test_invalid_query_is_bad_request() {
        let app = create_test_app(json!({}));
        let request = post_json(
            "/api/v1/query",
            json!({
                "query": {
                    "database": "db",
                    "table": "t",
                    "aggregates": [ { "label": "m", "function": "avg", "field": "*" } ]
                }
            }),
        );

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_QUERY");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_query_invalid_json() {
        let app = create_test_app(json!({}));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/query")
                    .header("Content-Type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_translate() {
        let app = create_test_app(json!({}));
        let request = post_json(
            "/api/v1/query/translate",
            json!({
                "query": {
                    "database": "logs",
                    "table": "events",
                    "where": {
                        "type": "singular",
                        "field": "status",
                        "operator": "=",
                        "value": "ok"
                    },
                    "limit": 20000
                }
            }),
        );

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["path"], "logs/events/_search");
        assert_eq!(body["scroll"], "1m");
        assert_eq!(body["body"]["size"], 10_000);
        assert_eq!(
            body["body"]["query"],
            json!({ "bool": { "must": [ { "term": { "status": "ok" } } ] } })
        );
    }
}
