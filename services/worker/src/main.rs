//! quarry worker
//!
//! Workers execute build jobs. Each runs a heartbeat loop against the
//! coordinator and serves committed artifacts to peer workers over
//! HTTP.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quarry_cache::{ArtifactCache, FileCache};
use quarry_worker::{api, config::Config, Worker};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting quarry worker");

    let config = Config::from_env()?;
    info!(
        endpoint = %config.public_endpoint,
        coordinator = %config.coordinator_url,
        cache_dir = %config.cache_dir.display(),
        "Configuration loaded"
    );

    let file_cache = FileCache::open(config.cache_dir.join("files"))?;
    let artifacts = ArtifactCache::open(config.cache_dir.join("artifacts"))?;

    let app = api::create_router(artifacts.clone());
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Artifact endpoint listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "artifact endpoint failed");
        }
    });

    let worker = Worker::new(config, file_cache, artifacts);
    worker.run().await;

    Ok(())
}
