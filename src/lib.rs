pub mod admission;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod registry;
pub mod state;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{admit_handler, health_handler, metrics_handler};
use crate::state::AppState;

// /health and /metrics, everything else goes through admission
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(admit_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
