use serde::{Deserialize, Serialize};

/// Top-level engine configuration. Loaded once at startup by
/// [`Settings::load`], which layers an optional `config/default.toml` file
/// under `ENGINE_`-prefixed environment variables, falling back to
/// [`Settings::default`] when neither source is present (the common case in
/// tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub chain: ChainSettings,
    pub routing: RoutingSettings,
    pub cache: CacheSettings,
    pub rpc: RpcSettings,
    pub base_tokens: BaseTokenSettings,
    pub safety: SafetySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    pub chain_id: u64,
    pub rpc_url: String,
    pub multicall3: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSettings {
    pub max_hops: usize,
    pub max_splits: usize,
    /// How often the background route pre-warmer runs a refresh cycle.
    pub route_cache_refresh_secs: u64,
    /// TTL of a warmed route-cache entry.
    pub route_cache_ttl_secs: u64,
}

/// Per-store TTLs for the three keyed caches plus the analysis entries that
/// live inside the pool store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub pool_ttl_secs: u64,
    pub price_ttl_secs: u64,
    pub token_ttl_secs: u64,
    pub analysis_ttl_secs: u64,
    /// `GetOrFill` per-key lock wait before force-removing a wedged lock.
    pub lock_wait_secs: u64,
}

/// Ordered RPC endpoints plus Gateway retry/backoff knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSettings {
    pub endpoints: Vec<String>,
    pub call_timeout_ms: u64,
    pub max_retry_passes: u32,
    pub backoff_base_ms: u64,
    /// An endpoint with more failures than this within `failure_window_secs`
    /// is skipped for one pass.
    pub failure_threshold: u32,
    pub failure_window_secs: u64,
}

/// The curated base-token set, named by role rather than address — addresses
/// live in `config::contracts` since they're chain-specific constants, not
/// tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseTokenSettings {
    pub price_stale_secs: u64,
    pub wrapper_price_floor_usd: f64,
    pub wrapper_price_ceiling_usd: f64,
    pub ecosystem_price_floor_usd: f64,
    pub ecosystem_price_ceiling_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetySettings {
    pub default_trade_usd: f64,
    pub min_safety_score_tradeable: i32,
    pub min_liquidity_ratio_tradeable: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 3001,
            },
            chain: ChainSettings {
                chain_id: 8453, // Base mainnet
                rpc_url: "https://mainnet.base.org".to_string(),
                multicall3: "0xcA11bde05977b3631167028862bE2a173976CA11".to_string(),
            },
            routing: RoutingSettings {
                max_hops: crate::utils::MAX_HOPS,
                max_splits: 3,
                route_cache_refresh_secs: 600,
                route_cache_ttl_secs: 600,
            },
            cache: CacheSettings {
                pool_ttl_secs: 300,
                price_ttl_secs: 30,
                token_ttl_secs: 3600,
                analysis_ttl_secs: 300,
                lock_wait_secs: 5,
            },
            rpc: RpcSettings {
                endpoints: vec!["https://mainnet.base.org".to_string()],
                call_timeout_ms: 8_000,
                max_retry_passes: 3,
                backoff_base_ms: 250,
                failure_threshold: 2,
                failure_window_secs: 60,
            },
            base_tokens: BaseTokenSettings {
                price_stale_secs: 30,
                wrapper_price_floor_usd: 100.0,
                wrapper_price_ceiling_usd: 2000.0,
                ecosystem_price_floor_usd: 0.1,
                ecosystem_price_ceiling_usd: 100.0,
            },
            safety: SafetySettings {
                default_trade_usd: crate::utils::DEFAULT_TRADE_USD,
                min_safety_score_tradeable: 30,
                min_liquidity_ratio_tradeable: 0.1,
            },
        }
    }
}

impl Settings {
    /// Builds configuration from an optional `config/default.toml` layered
    /// under `ENGINE_`-prefixed environment overrides (e.g.
    /// `ENGINE_SERVER__PORT=8080`). Falls back to [`Settings::default`] when
    /// neither a config file nor matching env vars are present, so tests and
    /// examples never need an `.env`.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("ENGINE").separator("__"));

        match builder.build() {
            Ok(cfg) => cfg.try_deserialize().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to deserialize settings, using defaults");
                Self::default()
            }),
            Err(err) => {
                tracing::warn!(error = %err, "failed to build settings, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_internally_consistent() {
        let settings = Settings::default();
        assert_eq!(settings.cache.pool_ttl_secs, 300);
        assert_eq!(settings.cache.price_ttl_secs, 30);
        assert_eq!(settings.cache.token_ttl_secs, 3600);
        assert_eq!(settings.safety.default_trade_usd, 1000.0);
        assert!(!settings.rpc.endpoints.is_empty());
    }

    #[test]
    fn test_load_falls_back_to_default_without_env_or_file() {
        let settings = Settings::load();
        assert_eq!(settings.chain.chain_id, 8453);
    }
}
