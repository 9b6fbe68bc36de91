//! Single-use upload tokens.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::{rngs::OsRng, RngCore};
use tokio::task::JoinHandle;
use tracing::debug;

const TOKEN_BYTES: usize = 16;

/// Issues and redeems short-lived, single-use tokens.
pub trait TokenStore: Send + Sync {
    fn issue(&self, ttl: Duration) -> String;

    /// Removes `token` and reports whether it was still valid.
    fn redeem(&self, token: &str) -> bool;

    /// Drops every expired token, returning how many were removed.
    fn sweep(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, Instant>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn issue(&self, ttl: Duration) -> String {
        let token = generate_token();
        let expires_at = Instant::now() + ttl;

        self.tokens.lock().insert(token.clone(), expires_at);
        debug!(ttl_secs = ttl.as_secs(), "Issued upload token");

        token
    }

    fn redeem(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let now = Instant::now();
        let entry = self.tokens.lock().remove(token);

        match entry {
            Some(expires_at) if now <= expires_at => true,
            Some(_) => {
                debug!("Rejected expired upload token");
                false
            }
            None => false,
        }
    }

    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut tokens = self.tokens.lock();
        let before = tokens.len();
        tokens.retain(|_, expires_at| *expires_at >= now);
        before - tokens.len()
    }

    fn len(&self) -> usize {
        self.tokens.lock().len()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Starts the periodic task that evicts expired tokens.
pub fn spawn_sweeper(store: Arc<dyn TokenStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                debug!(removed, remaining = store.len(), "Swept expired upload tokens");
            }
        }
    })
}
