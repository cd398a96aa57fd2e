use std::sync::Arc;

use anyhow::{Context, Result};
use fleet_master::config::Config;
use fleet_master::{build_app, AppState};
use fleet_scheduler::{Scheduler, SchedulerConfig};
use fleet_store::AnyStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleet_master=debug,fleet_scheduler=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting fleet master");

    let config = Config::from_env().context("failed to load configuration")?;

    let store = Arc::new(
        AnyStore::connect(&config.db_dsn)
            .await
            .context("failed to connect to store")?,
    );

    let scheduler = Scheduler::new(store.clone(), SchedulerConfig::default());
    let scheduler_metrics = scheduler.metrics();
    let loops = scheduler.spawn();
    tracing::info!(count = loops.len(), "scheduler loops started");

    let state = AppState {
        store,
        scheduler_metrics,
        api_key: config.api_key,
    };

    let app = build_app(state);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind listener")?;

    axum::serve(listener, app).await.context("server error")?;

    scheduler.shutdown_token().cancel();
    for handle in loops {
        let _ = handle.await;
    }

    Ok(())
}
