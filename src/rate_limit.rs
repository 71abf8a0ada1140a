//! Per-client token dispenser.
//!
//! Each client owns a single token. Claiming it schedules the next one exactly
//! one window after the claim. Pending refills listen on a cancellation signal
//! owned by the dispenser, so dropping (or closing) the dispenser stops them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::time::Instant;

/// Longest window a token may take to come back. Longer windows are clamped.
pub const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

// Ready-time sentinel for the token handed out at creation
const SEEDED: u64 = 0;

/// Result of trying to claim a client's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The token was taken; the next one is already scheduled.
    Granted,
    /// The current token only becomes ready after the caller arrived, so the
    /// caller can't have it.
    Exhausted,
}

pub struct TokenDispenser {
    tokens: Arc<Semaphore>,
    created_at: Instant,
    // nanos since `created_at` at which the current token became (or becomes) ready
    ready_at: AtomicU64,
    cancel: watch::Sender<()>,
}

impl TokenDispenser {
    // first token is ready right away
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(());
        Self {
            tokens: Arc::new(Semaphore::new(1)),
            created_at: Instant::now(),
            ready_at: AtomicU64::new(SEEDED),
            cancel,
        }
    }

    /// Wait for the token on behalf of a request issued at `issued_at`.
    ///
    /// Only tokens that were ready by `issued_at` can be claimed. On success
    /// the next token is scheduled `window` after this moment. The future is
    /// cancel safe: dropping it before it resolves leaves the token in place.
    pub async fn claim(&self, issued_at: Instant, window: Duration) -> Claim {
        let window = window.min(MAX_WINDOW);
        if !self.eligible(issued_at) {
            return Claim::Exhausted;
        }

        let permit = match self.tokens.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Claim::Exhausted,
        };
        // someone else may have taken the token between the check and the acquire
        if !self.eligible(issued_at) {
            drop(permit);
            return Claim::Exhausted;
        }

        permit.forget();
        let now = Instant::now();
        self.ready_at.store(self.offset(now + window), Ordering::Release);
        self.schedule_refill(window);
        Claim::Granted
    }

    /// Cancel every pending refill. The token of a closed dispenser is gone
    /// for good, so only call this on dispensers nobody will use again.
    pub fn close(&self) {
        self.cancel.send_replace(());
    }

    pub fn available(&self) -> bool {
        self.tokens.available_permits() > 0
    }

    // one receiver per refill task still sleeping
    pub fn pending_refills(&self) -> usize {
        self.cancel.receiver_count()
    }

    // Token sitting there unclaimed: indistinguishable from a fresh dispenser
    pub fn is_idle(&self) -> bool {
        self.available() && self.pending_refills() == 0
    }

    fn eligible(&self, issued_at: Instant) -> bool {
        match self.ready_at.load(Ordering::Acquire) {
            SEEDED => true,
            nanos => self.created_at + Duration::from_nanos(nanos) <= issued_at,
        }
    }

    fn offset(&self, at: Instant) -> u64 {
        let nanos = at.duration_since(self.created_at).as_nanos();
        u64::try_from(nanos).unwrap_or(u64::MAX).max(SEEDED + 1)
    }

    fn schedule_refill(&self, window: Duration) {
        let tokens: Weak<Semaphore> = Arc::downgrade(&self.tokens);
        let mut cancelled = self.cancel.subscribe();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(window) => {
                    if let Some(tokens) = tokens.upgrade() {
                        tokens.add_permits(1);
                    }
                }
                // fires on close() and when the dispenser is dropped
                _ = cancelled.changed() => {
                    tracing::trace!("refill cancelled");
                }
            }
        });
    }
}

impl Default for TokenDispenser {
    fn default() -> Self {
        Self::new()
    }
}
