//! Admission coordinator: one admit-or-reject decision per request.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::identity::{RemoteAddr, client_key};
use crate::metrics::ADMISSION_WAIT;
use crate::rate_limit::Claim;
use crate::registry::DispenserRegistry;

pub use crate::rate_limit::MAX_WINDOW;

/// The only way admission fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("one request per {window:?} allowed")]
    RateLimited { window: Duration },
}

impl AdmissionError {
    pub fn window(&self) -> Duration {
        match self {
            AdmissionError::RateLimited { window } => *window,
        }
    }
}

#[derive(Clone)]
pub struct Coordinator {
    registry: Arc<DispenserRegistry>,
}

impl Coordinator {
    pub fn new(registry: Arc<DispenserRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<DispenserRegistry> {
        &self.registry
    }

    /// Admit `request` if its client's token can be claimed within `window`.
    ///
    /// Hands the request back on admission. Rejection never happens before
    /// `window` has elapsed since the call started.
    pub async fn wait<R: RemoteAddr>(
        &self,
        request: R,
        window: Duration,
    ) -> Result<R, AdmissionError> {
        let window = window.min(MAX_WINDOW);
        let issued_at = Instant::now();
        let deadline = issued_at + window;

        let client = client_key(&request.remote_addr());
        let dispenser = self.registry.get_or_create(&client);

        let claim = dispenser.claim(issued_at, window);
        let outcome = match tokio::time::timeout_at(deadline, claim).await {
            Ok(Claim::Granted) => Ok(request),
            Ok(Claim::Exhausted) => {
                tokio::time::sleep_until(deadline).await;
                Err(AdmissionError::RateLimited { window })
            }
            Err(_elapsed) => Err(AdmissionError::RateLimited { window }),
        };

        ADMISSION_WAIT.observe(issued_at.elapsed().as_secs_f64());
        match &outcome {
            Ok(_) => tracing::debug!(client = %client, "admitted"),
            Err(e) => tracing::debug!(client = %client, error = %e, "rejected"),
        }
        outcome
    }
}
