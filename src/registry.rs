use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, interval};
use crate::metrics::{EVICTED_CLIENTS, TRACKED_CLIENTS};
use crate::rate_limit::TokenDispenser;

// One dispenser per client, plus when we last saw that client
struct ClientEntry {
    dispenser: Arc<TokenDispenser>,
    last_seen: Instant,
}

impl ClientEntry {
    fn new(now: Instant) -> Self {
        Self {
            dispenser: Arc::new(TokenDispenser::new()),
            last_seen: now,
        }
    }

    // safe to drop: token is back and no request holds the dispenser
    fn evictable(&self) -> bool {
        Arc::strong_count(&self.dispenser) == 1 && self.dispenser.is_idle()
    }
}

// A full registry clears this fraction of the cap in idle clients at once
const EVICTION_BATCH_DIVISOR: usize = 16;

pub struct DispenserRegistry {
    clients: DashMap<String, ClientEntry>,
    max_clients: usize, // 0 = unbounded
    idle_ttl: Duration,
}

impl DispenserRegistry {
    pub fn new(max_clients: usize, idle_ttl: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            max_clients,
            idle_ttl,
        }
    }

    // Existing dispenser for the key, or a fresh one with its first token ready
    pub fn get_or_create(&self, client_key: &str) -> Arc<TokenDispenser> {
        let now = Instant::now();

        if let Some(mut entry) = self.clients.get_mut(client_key) {
            entry.last_seen = now;
            return Arc::clone(&entry.dispenser);
        }

        // entry() holds the shard lock, so two first requests can't both insert
        let mut entry = self
            .clients
            .entry(client_key.to_string())
            .or_insert_with(|| {
                tracing::debug!(client = client_key, "new client");
                ClientEntry::new(now)
            });
        entry.last_seen = now;
        let dispenser = Arc::clone(&entry.dispenser);
        drop(entry);

        // other first requests may have inserted concurrently, so trim until
        // we are back under the cap
        if self.max_clients > 0 {
            while self.clients.len() > self.max_clients {
                if !self.evict_least_recent(client_key) {
                    break;
                }
            }
        }

        TRACKED_CLIENTS.set(self.clients.len() as i64);
        dispenser
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, client_key: &str) -> bool {
        self.clients.contains_key(client_key)
    }

    /// Drop dispensers of clients not seen for `idle_ttl` whose token is back.
    ///
    /// Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let before = self.clients.len();
        let idle_ttl = self.idle_ttl;
        self.clients
            .retain(|_, entry| !(entry.evictable() && entry.last_seen.elapsed() >= idle_ttl));

        let evicted = before.saturating_sub(self.clients.len());
        EVICTED_CLIENTS.inc_by(evicted as u64);
        TRACKED_CLIENTS.set(self.clients.len() as i64);
        evicted
    }

    // Evict down to the cap in one scan, never touching `keep`. Idle clients go
    // first; if every client is busy the least recent ones lose their
    // dispenser and pending refill. Also clears out a batch of extra idle
    // clients so the next few inserts don't have to scan again.
    //
    // Returns false when there was nothing to evict.
    fn evict_least_recent(&self, keep: &str) -> bool {
        let need = self.clients.len().saturating_sub(self.max_clients);
        let batch = need + self.max_clients / EVICTION_BATCH_DIVISOR;

        let mut victims: Vec<(bool, Instant, String)> = self
            .clients
            .iter()
            .filter(|entry| entry.key() != keep)
            .map(|entry| (!entry.evictable(), entry.last_seen, entry.key().clone()))
            .collect();
        if victims.is_empty() {
            return false;
        }
        victims.sort();

        let mut evicted = 0;
        for (busy, _, key) in victims {
            let removed = if evicted < need {
                self.clients.remove(&key)
            } else if !busy && evicted < batch {
                // idle extras only, and only if nobody picked them up meanwhile
                self.clients.remove_if(&key, |_, entry| entry.evictable())
            } else {
                break;
            };

            if let Some((key, entry)) = removed {
                if busy {
                    tracing::warn!(
                        client = %key,
                        max_clients = self.max_clients,
                        "client table full, evicting a busy client"
                    );
                }
                entry.dispenser.close();
                evicted += 1;
            }
        }

        EVICTED_CLIENTS.inc_by(evicted as u64);
        true
    }
}

// Background sweep - runs every `every`
pub async fn sweeper(registry: Arc<DispenserRegistry>, every: Duration) {
    let mut interval = interval(every);

    tracing::info!(interval = ?every, "registry sweeper started");

    loop {
        interval.tick().await;

        let evicted = registry.sweep();
        if evicted > 0 {
            tracing::info!(evicted, remaining = registry.len(), "evicted idle clients");
        }
    }
}
