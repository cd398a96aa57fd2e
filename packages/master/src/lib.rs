//! The master HTTP API: a request-authenticated surface for worker
//! registration, heartbeats, polling, job submission, and lifecycle control.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use fleet_scheduler::SchedulingMetrics;
use fleet_store::Store;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub scheduler_metrics: Arc<SchedulingMetrics>,
    pub api_key: String,
}

pub fn build_app(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/nodes/register", post(routes::nodes::register))
        .route("/nodes", get(routes::nodes::get_all))
        .route("/nodes/:id", get(routes::nodes::get_one))
        .route("/nodes/:id/heartbeat", post(routes::nodes::heartbeat))
        .route("/nodes/:id/poll", post(routes::nodes::poll))
        .route("/jobs", post(routes::jobs::submit).get(routes::jobs::get_all))
        .route("/jobs/:id", get(routes::jobs::get_one))
        .route("/jobs/:id/progress", post(routes::jobs::progress))
        .route("/jobs/:id/complete", post(routes::jobs::complete))
        .route("/jobs/:id/cancel", post(routes::jobs::cancel))
        .route("/jobs/:id/pause", post(routes::jobs::pause))
        .route("/jobs/:id/resume", post(routes::jobs::resume))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
