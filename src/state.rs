use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use crate::admission::Coordinator;
// app's shared state

pub struct AppState {
    pub coordinator: Coordinator,
    pub window: Duration, // one admission per client per window
    served: AtomicU64,
    rejected: AtomicU64,
}

impl AppState {
    pub fn new(coordinator: Coordinator, window: Duration) -> Self {
        Self {
            coordinator,
            window,
            served: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    // bump and return the new count
    pub fn record_served(&self) -> u64 {
        self.served.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_rejected(&self) -> u64 {
        self.rejected.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}
