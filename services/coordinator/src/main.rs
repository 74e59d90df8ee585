//! quarry coordinator
//!
//! The coordinator is the central service of the build system. It
//! accepts build graphs, gates them on source uploads, schedules jobs
//! across the worker pool, and streams status back to clients.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quarry_cache::FileCache;
use quarry_coordinator::{api, config::Config, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting quarry coordinator");

    let config = Config::from_env()?;
    info!(listen_addr = %config.listen_addr, cache_dir = %config.cache_dir.display(), "Configuration loaded");

    let file_cache = FileCache::open(&config.cache_dir)?;
    let state = AppState::new(config.clone(), file_cache);

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    axum::serve(listener, app).await?;

    Ok(())
}
