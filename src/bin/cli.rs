//! searchbridge CLI
//!
//! Command-line interface for working with queries:
//! - Translate a query file into the backend request
//! - Run a query file against the backend
//! - Check backend status
//! - Generate a default config

use clap::{Parser, Subcommand};
use searchbridge::config::{generate_default_config, Config, PathStyle};
use searchbridge::query::{Query, QueryOptions};
use searchbridge::search::{
    build_request, export, validate, HttpTransport, OutputFormat, ResultSet, Row, SearchAdapter,
    SearchTransport,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "searchbridge-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile and run logical queries against a search backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overriding the config
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Output format (table, json, ndjson, csv)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the backend request compiled from a query file
    Translate {
        /// Path to a query JSON file
        path: PathBuf,
    },

    /// Run a query file and print the rows
    Run {
        /// Path to a query JSON file
        path: PathBuf,
        /// Skip session filters (logged only)
        #[arg(long)]
        ignore_filters: bool,
    },

    /// Check that the backend is reachable
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "searchbridge=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.backend_url {
        config.backend.url = url.clone();
    }

    match cli.command {
        Commands::Translate { path } => {
            let query = read_query(&path)?;

            let request = match validate(&query).and_then(|()| build_request(&query)) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            };

            let path = request.path(config.backend.path_style);
            match request.scroll() {
                Some(keep_alive) => println!("POST /{}?scroll={}", path, keep_alive),
                None => println!("POST /{}", path),
            }
            println!("{}", serde_json::to_string_pretty(&request.body())?);
        }

        Commands::Run {
            path,
            ignore_filters,
        } => {
            let query = read_query(&path)?;
            let transport = HttpTransport::new(&config.backend)?;
            let adapter = SearchAdapter::new(Arc::new(transport));
            let options = QueryOptions {
                ignore_filters,
                ..QueryOptions::default()
            };

            let result = match adapter.execute(&query, &options).await {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("Query failed: {}", e);
                    std::process::exit(1);
                }
            };

            match OutputFormat::from_str(&cli.format) {
                Some(format) => print!("{}", export::render(&result.rows, format)?),
                None => print_table(&result),
            }
        }

        Commands::Status => {
            let transport = HttpTransport::new(&config.backend)?;

            println!("searchbridge v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Backend: {}", config.backend.url);
            println!(
                "Path style: {}",
                match config.backend.path_style {
                    PathStyle::Typed => "typed",
                    PathStyle::Index => "index",
                }
            );

            match transport.ping().await {
                Ok(()) => println!("Status: reachable"),
                Err(e) => {
                    println!("Status: unreachable ({})", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn read_query(path: &Path) -> Result<Query, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read query file {:?}: {}", path, e))?;
    let query = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid query in {:?}: {}", path, e))?;
    Ok(query)
}

fn print_table(result: &ResultSet) {
    if result.rows.is_empty() {
        println!("No rows ({} total hits)", result.total_hits);
        return;
    }

    let columns = export::columns(&result.rows);
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| columns.iter().map(|c| format_cell(row, c)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    // Header
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<width$}", c, width = w))
        .collect();
    println!("{}", header.join(" | "));

    // Separator
    let total: usize = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
    println!("{}", "-".repeat(total));

    // Data rows
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = w))
            .collect();
        println!("{}", line.join(" | "));
    }

    println!();
    println!(
        "{} rows, {} total hits, backend {}ms, total {}ms",
        result.rows.len(),
        result.total_hits,
        result.took_ms,
        result.execution_time_ms
    );
    if let Some(scroll_id) = &result.scroll_id {
        println!("Scroll cursor: {}", scroll_id);
    }
}

fn format_cell(row: &Row, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{:.2}", f),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}
