//! hbt-ui - Hediyele blind test web UI
//!
//! Serves the survey and blind comparison screens and relays recommendations
//! and results to the blind-test API.

use anyhow::Result;
use clap::Parser;
use hbt_common::config::ConfigResolver;
use hbt_ui::client::BlindTestClient;
use hbt_ui::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line arguments; each overrides environment and config file
#[derive(Debug, Parser)]
#[command(name = "hbt-ui", version, about = "Hediyele blind test web UI")]
struct Args {
    /// Base URL of the blind-test API (env: HBT_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Listen address (env: HBT_BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,

    /// Config file (env: HBT_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification first, before anything can fail
    info!(
        "Starting Hediyele Blind Test UI (hbt-ui) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = ConfigResolver::new()
        .with_api_url(args.api_url)
        .with_bind_addr(args.bind)
        .with_config_path(args.config)
        .resolve()?;

    let client = BlindTestClient::new(&config.api_base_url)?;
    info!("Blind-test API: {}", client.base_url());
    let state = AppState::new(Arc::new(client));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("hbt-ui listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
