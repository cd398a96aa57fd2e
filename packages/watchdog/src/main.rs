use anyhow::{Context, Result};
use fleet_watchdog::{WatchDaemon, WatchdogConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleet_watchdog=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting fleet watchdog");

    let config = WatchdogConfig::from_env();
    let daemon = WatchDaemon::new(config);
    let cancel = CancellationToken::new();

    let loops = daemon.spawn(cancel.clone());

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");
    cancel.cancel();

    for handle in loops {
        let _ = handle.await;
    }

    Ok(())
}
