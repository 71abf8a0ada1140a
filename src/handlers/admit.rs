use axum::extract::{Request, State};
use std::sync::Arc;
use crate::error::AppError;
use crate::state::AppState;
use crate::metrics::{ADMITTED_TOTAL, REJECTED_TOTAL, REQUEST_TOTAL};

// catch-all handler - every path and method goes through admission
pub async fn admit_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<String, AppError> {
    REQUEST_TOTAL.inc();

    match state.coordinator.wait(request, state.window).await {
        Ok(request) => {
            ADMITTED_TOTAL.inc();
            let served = state.record_served();
            tracing::info!(method = %request.method(), path = %request.uri().path(), served, "OK");
            Ok(format!("OK, {} requests served\n", served))
        }
        Err(source) => {
            REJECTED_TOTAL.inc();
            let rejected = state.record_rejected();
            tracing::info!(error = %source, rejected, "timeout");
            Err(AppError::RateLimited { source, rejected })
        }
    }
}
