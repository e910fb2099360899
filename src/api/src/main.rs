//! Club Events API
//!
//! Scrapes the club's Rubric events page and serves it as JSON behind an
//! hourly cache.

mod cli;
mod config;
mod error;
mod retry;
mod routes;
mod scraper;
mod types;

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::routes::AppState;
use crate::scraper::{browser_source, EventsCache, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => run_server(host, port).await,
        Commands::Fetch { format, retries } => cli::run_fetch(format, retries).await,
    }
}

/// Run the API server.
async fn run_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "events_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("Events source: {}", config.source.url);
    tracing::info!("Cache freshness: {}s", config.cache.freshness_secs);

    let source = browser_source(&config.source)?;
    let cache = EventsCache::new(
        Arc::new(source),
        Arc::new(SystemClock),
        config.cache.freshness()?,
    );

    // Create application state
    let state = Arc::new(AppState {
        cache,
        config: config.clone(),
    });

    if state.config.cache.prefetch_on_start {
        let state = state.clone();
        tokio::spawn(async move {
            tracing::info!("Prefetching events");
            if let Err(e) = state.cache.get_events().await {
                tracing::warn!("Prefetch failed: {}", e);
            }
        });
    }

    let app = routes::router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
