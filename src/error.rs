//! Errors surfaced by the HTTP layer.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::admission::AdmissionError;

/// Maps to `429 Too Many Requests` with a `Retry-After` of one window.
#[derive(Debug)]
pub enum AppError {
    /// Rejected by the rate limit, with the rejection count so far.
    RateLimited { source: AdmissionError, rejected: u64 },
    /// Metrics could not be encoded (500).
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::RateLimited { source, rejected } => {
                let body = format!("{}, {} requests timed out\n", source, rejected);
                let mut resp = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                // round up so clients never retry early
                let window = source.window();
                let secs = window.as_secs() + u64::from(window.subsec_nanos() > 0);
                resp.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                resp
            }
            AppError::Internal(msg) => {
                tracing::error!("{}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
        }
    }
}
