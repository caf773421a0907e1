//! Matrix user directory search filter (reverse proxy).
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                 ┌──────────────────────────────────────────┐
//!     ──────────────────────▶│ request id → trace → timeout             │
//!                            │        │                                 │
//!                            │        ▼                                 │
//!                            │  search filter ── buffering response ──┐ │
//!                            │        │                               │ │
//!                            │        ▼                               │ │       Homeserver
//!                            │  forward handler ──────────────────────┼─┼────▶ (Synapse, ...)
//!                            │                                        │ │
//!     ◀──────────────────────│  gate → decode → retain → encode ◀─────┘ │
//!                            └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use matrix_search_filter::config::{load_config, ConfigWatcher};
use matrix_search_filter::lifecycle::signals::shutdown_on_signal;
use matrix_search_filter::observability::{logging, metrics};
use matrix_search_filter::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "matrix-search-filter")]
#[command(about = "Reverse proxy filtering Matrix user directory search results", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "search-filter.toml")]
    config: PathBuf,

    /// Reload the [filter] section when the configuration file changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability);

    tracing::info!("matrix-search-filter v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        pattern = %config.filter.user_id_regex,
        last_modified = config.filter.last_modified,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config.clone())?;
    let shutdown = Shutdown::new();

    // The watcher must outlive the server.
    let _watcher = if cli.watch {
        let (watcher, mut updates) = ConfigWatcher::new(&cli.config, config);
        let handle = server.filter();
        tokio::spawn(async move {
            while let Some(settings) = updates.recv().await {
                if let Err(e) = handle.reload(&settings) {
                    tracing::error!(error = %e, "Filter reload rejected, keeping current filter");
                }
            }
        });
        Some(watcher.run()?)
    } else {
        None
    };

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_on_signal(&signal_shutdown).await;
    });

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
