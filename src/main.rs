//! searchbridge API server
//!
//! Run with: cargo run --bin searchbridge [config.toml]
//!
//! # Configuration
//!
//! Without a path argument the config is read from the default locations
//! (see [`Config::load_default`]). `SEARCHBRIDGE_*` environment variables
//! override file settings; `RUST_LOG` overrides the configured log level.

use searchbridge::api::{serve, AppState};
use searchbridge::config::{Config, LoggingConfig};
use searchbridge::search::{HttpTransport, SearchAdapter, SearchTransport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_with_env(&PathBuf::from(path))?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting searchbridge v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Search backend: {} (path style {:?})",
        config.backend.url,
        config.backend.path_style
    );

    let transport = HttpTransport::new(&config.backend)?;

    match transport.ping().await {
        Ok(()) => tracing::info!("Search backend reachable"),
        Err(e) => tracing::warn!("Search backend not reachable yet: {}", e),
    }

    let adapter = SearchAdapter::new(Arc::new(transport));
    let state = AppState::new(adapter, config.api.clone(), config.backend.path_style);

    serve(state, &config.api).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("searchbridge={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
