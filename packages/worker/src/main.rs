use anyhow::{Context, Result};
use fleet_worker::config::Config;
use fleet_worker::Worker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleet_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting fleet worker");

    let config = Config::from_env().context("failed to load configuration")?;
    let worker = Worker::bootstrap(config).await.context("failed to bootstrap worker")?;
    tracing::info!(node_id = %worker.node_id, "worker bootstrapped");

    let loops = worker.spawn();
    let shutdown = worker.shutdown_token();

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");
    shutdown.cancel();

    for handle in loops {
        let _ = handle.await;
    }

    Ok(())
}
