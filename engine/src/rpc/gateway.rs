//! RPC Gateway (§4.1): an ordered set of chain endpoints with failure
//! accounting and round-robin failover. No teacher equivalent — the teacher
//! synthesizes mock pools rather than reading chain state — so this is
//! grounded on the alloy `ProviderBuilder`/HTTP-transport idiom from
//! `other_examples/e52fa109_raul2hot-sniper__...fetcher.rs`.

use crate::config::settings::RpcSettings;
use crate::utils::error::{EngineError, Result};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_transport_http::Http;
use reqwest::Client;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

type HttpProvider = RootProvider<Http<Client>>;

struct Endpoint {
    url: String,
    provider: HttpProvider,
    failure_count: AtomicU32,
    last_failure_at: AsyncMutex<Option<Instant>>,
}

/// Ordered set of chain RPC endpoints with round-robin failover (§4.1).
pub struct RpcGateway {
    endpoints: Vec<Endpoint>,
    start: AtomicUsize,
    settings: RpcSettings,
}

impl RpcGateway {
    pub fn new(settings: RpcSettings) -> Result<Self> {
        let mut endpoints = Vec::with_capacity(settings.endpoints.len());
        for url in &settings.endpoints {
            let parsed = url
                .parse()
                .map_err(|_| EngineError::Internal(format!("invalid RPC endpoint url: {}", mask_url(url))))?;
            let provider = ProviderBuilder::new().on_http(parsed);
            endpoints.push(Endpoint {
                url: url.clone(),
                provider,
                failure_count: AtomicU32::new(0),
                last_failure_at: AsyncMutex::new(None),
            });
        }
        if endpoints.is_empty() {
            return Err(EngineError::Internal("no RPC endpoints configured".to_string()));
        }
        Ok(Self { endpoints, start: AtomicUsize::new(0), settings })
    }

    /// Runs `op` against endpoints round-robin from the rotating start
    /// index. A successful endpoint becomes the new start. An endpoint with
    /// more than `failure_threshold` failures within `failure_window_secs`
    /// is skipped for this pass. After every endpoint fails in one pass,
    /// sleeps `backoff_base_ms × pass` and retries, up to
    /// `max_retry_passes` total passes.
    pub async fn execute<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: Fn(&HttpProvider) -> Fut,
        Fut: Future<Output = std::result::Result<T, String>>,
    {
        let n = self.endpoints.len();
        let mut last_error = String::from("no endpoints attempted");

        for pass in 1..=self.settings.max_retry_passes {
            let start = self.start.load(Ordering::Relaxed);
            let mut attempted_any = false;

            for i in 0..n {
                let idx = (start + i) % n;
                let endpoint = &self.endpoints[idx];

                if self.should_skip(endpoint).await {
                    continue;
                }
                attempted_any = true;

                match op(&endpoint.provider).await {
                    Ok(value) => {
                        endpoint.failure_count.store(0, Ordering::Relaxed);
                        *endpoint.last_failure_at.lock().await = None;
                        self.start.store(idx, Ordering::Relaxed);
                        return Ok(value);
                    }
                    Err(err) => {
                        tracing::warn!(endpoint = %mask_url(&endpoint.url), error = %err, "rpc call failed");
                        endpoint.failure_count.fetch_add(1, Ordering::Relaxed);
                        *endpoint.last_failure_at.lock().await = Some(Instant::now());
                        last_error = err;
                    }
                }
            }

            if !attempted_any {
                // Every endpoint is in its failure cooldown; treat the pass
                // as exhausted rather than spinning.
                last_error = "all endpoints are in failure cooldown".to_string();
            }

            if pass < self.settings.max_retry_passes {
                let backoff = Duration::from_millis(self.settings.backoff_base_ms * pass as u64);
                tokio::time::sleep(backoff).await;
            }
        }

        Err(EngineError::AllProvidersFailed(last_error))
    }

    async fn should_skip(&self, endpoint: &Endpoint) -> bool {
        let failures = endpoint.failure_count.load(Ordering::Relaxed);
        if failures <= self.settings.failure_threshold {
            return false;
        }
        let guard = endpoint.last_failure_at.lock().await;
        match *guard {
            Some(at) => at.elapsed() < Duration::from_secs(self.settings.failure_window_secs),
            None => false,
        }
    }
}

/// Masks everything past the host so endpoint URLs (often carrying an API
/// key in the path) never reach logs unredacted.
pub fn mask_url(url: &str) -> String {
    if let Some(scheme_end) = url.find("://") {
        let after_scheme = &url[scheme_end + 3..];
        let host_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        let host = &after_scheme[..host_end];
        format!("{}://{}/***", &url[..scheme_end], host)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_path_and_key_but_keeps_host() {
        let masked = mask_url("https://eth-mainnet.g.alchemy.com/v2/super-secret-key");
        assert_eq!(masked, "https://eth-mainnet.g.alchemy.com/***");
    }

    #[test]
    fn masks_bare_host() {
        let masked = mask_url("https://mainnet.base.org");
        assert_eq!(masked, "https://mainnet.base.org/***");
    }
}
