//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{ApiConfig, PathStyle};
use crate::search::SearchAdapter;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Compiles and runs queries against the backend
    pub adapter: Arc<SearchAdapter>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Search path layout, for translated request paths
    pub path_style: PathStyle,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(adapter: SearchAdapter, config: ApiConfig, path_style: PathStyle) -> Self {
        Self {
            adapter: Arc::new(adapter),
            config: Arc::new(config),
            path_style,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
