//! Route Cache (§4.11, §5): a TTL'd per-pair store plus a single-flight
//! background pre-warmer over a small curated pair set. Grounded on the
//! teacher's `cache/enhanced_route_cache.rs` (keyed, TTL'd route storage)
//! and `main.rs`'s periodic background task, generalized from a
//! request-populated LRU to a cycle that proactively refreshes a fixed pair
//! list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use parking_lot::RwLock;

use crate::config::contracts::BaseTokens;
use crate::routing::router::{Router, RouteResult};

struct Entry {
    result: RouteResult,
    inserted_at: std::time::Instant,
}

/// Keyed by `(tokenIn, tokenOut)`; `isRefreshing` makes a refresh cycle
/// single-flight (§5 "Route Cache has a single `isRefreshing` flag").
pub struct RouteCache {
    entries: RwLock<std::collections::HashMap<(Address, Address), Entry>>,
    ttl: Duration,
    refreshing: AtomicBool,
    shutdown: AtomicBool,
    shutdown_notify: tokio::sync::Notify,
}

impl RouteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(std::collections::HashMap::new()),
            ttl,
            refreshing: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            shutdown_notify: tokio::sync::Notify::new(),
        }
    }

    /// Stops the background pre-warmer after its current cycle (§9
    /// "must be cancellable on shutdown (stop flag)"). Idempotent.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.shutdown_notify.notify_waiters();
    }

    pub fn get(&self, token_in: Address, token_out: Address) -> Option<RouteResult> {
        let entries = self.entries.read();
        let entry = entries.get(&(token_in, token_out))?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    pub fn set(&self, token_in: Address, token_out: Address, result: RouteResult) {
        self.entries.write().insert((token_in, token_out), Entry { result, inserted_at: std::time::Instant::now() });
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// The curated pair set a refresh cycle walks: every ordered pair among
    /// the base-token roles used elsewhere for discovery/routing.
    fn curated_pairs() -> Vec<(Address, Address)> {
        let mut tokens: Vec<Address> = BaseTokens::primary().iter().map(|t| t.parsed_address()).collect();
        tokens.extend(BaseTokens::secondary().iter().map(|t| t.parsed_address()));
        tokens.push(BaseTokens::wrapper().parsed_address());
        tokens.dedup();

        let mut pairs = Vec::new();
        for &a in &tokens {
            for &b in &tokens {
                if a != b {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// One refresh cycle: analyzes each unique token in the curated set once
    /// (in parallel, reusing the Analyzer's own cache) then walks the pair
    /// list computing routes from the cached analyses. A no-op if a cycle is
    /// already in flight.
    pub async fn refresh_cycle(self: &Arc<Self>, router: Arc<Router>, default_trade_usd: f64) {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            return;
        }

        let pairs = Self::curated_pairs();

        let mut unique_tokens: Vec<Address> = pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
        unique_tokens.sort();
        unique_tokens.dedup();
        router.warm_tokens(&unique_tokens).await;

        for (token_in, token_out) in pairs {
            match router.find_best_route(token_in, token_out, default_trade_usd).await {
                Ok(result) => self.set(token_in, token_out, result),
                Err(err) => tracing::debug!(%token_in, %token_out, error = %err, "route cache refresh skipped pair"),
            }
        }

        self.refreshing.store(false, Ordering::Release);
    }

    /// Background loop: sleeps `interval` between single-flight refresh
    /// cycles until [`Self::request_shutdown`] fires, then exits after the
    /// in-flight cycle (if any) completes.
    pub async fn run_refresh_loop(self: Arc<Self>, router: Arc<Router>, default_trade_usd: f64, interval: Duration) {
        while !self.shutdown.load(Ordering::Acquire) {
            self.refresh_cycle(Arc::clone(&router), default_trade_usd).await;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.shutdown_notify.notified() => break,
            }
        }
        tracing::info!("route cache refresh loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_pairs_excludes_self_pairs() {
        let pairs = RouteCache::curated_pairs();
        assert!(pairs.iter().all(|(a, b)| a != b));
    }
}
