//! The three keyed stores plus the boundary-matched invalidation rule
//! (§4.5). Grounded on teacher's `cache/lru_cache.rs` (independent TTL'd
//! stores) and `cache/enhanced_route_cache.rs` (bucketed/prefixed keys).

use std::time::Duration;

use alloy_primitives::Address;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::store::KeyedStore;
use crate::config::settings::CacheSettings;
use crate::model::analysis::AnalysisResult;
use crate::model::pool::Pool;
use crate::model::token::TokenInfo;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap());
static GENERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_x]{1,100}$").unwrap());

fn is_address_key(key: &str) -> bool {
    ADDRESS_RE.is_match(key)
}

/// Pool-store keys: bare addresses, `v2_<addr>` / `v3_<addr>` candidate
/// keys, or a generic lowercase token.
fn is_pool_key(key: &str) -> bool {
    if is_address_key(key) || GENERIC_RE.is_match(key) {
        return true;
    }
    if let Some(rest) = key.strip_prefix("v2_").or_else(|| key.strip_prefix("v3_")) {
        return is_address_key(rest);
    }
    false
}

/// Analysis-store keys: `analysis_<addr>` only.
fn is_analysis_key(key: &str) -> bool {
    key.strip_prefix("analysis_").is_some_and(is_address_key)
}

fn lower_hex(addr: Address) -> String {
    format!("{addr:#x}").to_lowercase()
}

/// The three-store keyed cache (§4.5): pool, price, token — each with its
/// own TTL and single-flight lock map.
pub struct EngineCache {
    pub pools: KeyedStore<Pool>,
    pub prices: KeyedStore<f64>,
    pub tokens: KeyedStore<TokenInfo>,
    pub analyses: KeyedStore<AnalysisResult>,
}

impl EngineCache {
    pub fn new(settings: &CacheSettings) -> Self {
        let lock_wait = Duration::from_secs(settings.lock_wait_secs);
        Self {
            pools: KeyedStore::new(Duration::from_secs(settings.pool_ttl_secs), lock_wait, is_pool_key),
            prices: KeyedStore::new(Duration::from_secs(settings.price_ttl_secs), lock_wait, is_address_key),
            tokens: KeyedStore::new(Duration::from_secs(settings.token_ttl_secs), lock_wait, is_address_key),
            analyses: KeyedStore::new(Duration::from_secs(settings.analysis_ttl_secs), lock_wait, is_analysis_key),
        }
    }

    pub fn analysis_key(addr: Address) -> String {
        format!("analysis_{}", lower_hex(addr))
    }

    pub fn get_analysis(&self, addr: Address) -> Option<AnalysisResult> {
        self.analyses.get(&Self::analysis_key(addr))
    }

    pub fn get_analysis_with_age(&self, addr: Address) -> Option<(AnalysisResult, std::time::Duration)> {
        self.analyses.get_with_age(&Self::analysis_key(addr))
    }

    pub fn set_analysis(&self, addr: Address, result: AnalysisResult) {
        self.analyses.set(&Self::analysis_key(addr), result);
    }

    /// `ClearTokenAnalysis(addr)`: removes the `analysis_<addr>` entry, the
    /// token and price entries for `addr`, and every pool-store key that
    /// contains `addr` as an underscore-delimited token — never a bare
    /// substring match.
    pub fn clear_token_analysis(&self, addr: Address) {
        let needle = lower_hex(addr);

        self.analyses.remove(&Self::analysis_key(addr));
        self.tokens.remove(&needle);
        self.prices.remove(&needle);

        let stale: Vec<String> = self
            .pools
            .keys()
            .into_iter()
            .filter(|key| key_contains_address(key, &needle))
            .collect();
        for key in stale {
            self.pools.remove(&key);
        }
    }
}

fn key_contains_address(key: &str, addr_lower: &str) -> bool {
    key.eq_ignore_ascii_case(addr_lower) || key.split('_').any(|part| part.eq_ignore_ascii_case(addr_lower))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::address_from_u64;

    fn settings() -> CacheSettings {
        CacheSettings {
            pool_ttl_secs: 300,
            price_ttl_secs: 30,
            token_ttl_secs: 3600,
            analysis_ttl_secs: 300,
            lock_wait_secs: 5,
        }
    }

    #[test]
    fn pool_key_accepts_address_prefixed_and_generic_forms() {
        let addr = lower_hex(address_from_u64(1));
        assert!(is_pool_key(&addr));
        assert!(is_pool_key(&format!("v2_{addr}")));
        assert!(is_pool_key(&format!("v3_{addr}")));
        assert!(is_pool_key(&format!("analysis_{addr}")));
        assert!(is_pool_key("route_cache_x1"));
        assert!(!is_pool_key("Not Valid!"));
    }

    #[test]
    fn clear_token_analysis_removes_boundary_matches_only() {
        let cache = EngineCache::new(&settings());
        let target = address_from_u64(7);
        let other = address_from_u64(8);
        let needle = lower_hex(target);
        let other_hex = lower_hex(other);

        cache.tokens.set(&needle, TokenInfo::unknown(target));
        cache.prices.set(&needle, 1.0);

        // Boundary matches that must be cleared.
        cache.pools.set(&format!("v2_{needle}"), dummy_pool());
        cache.analyses.set(&format!("analysis_{needle}"), dummy_analysis());

        let unrelated_key = format!("v2_{other_hex}");
        cache.pools.set(&unrelated_key, dummy_pool());

        cache.clear_token_analysis(target);

        assert!(cache.tokens.get(&needle).is_none());
        assert!(cache.prices.get(&needle).is_none());
        assert!(cache.pools.get(&format!("v2_{needle}")).is_none());
        assert!(cache.get_analysis(target).is_none());
        assert!(cache.pools.get(&unrelated_key).is_some());
    }

    fn dummy_pool() -> Pool {
        use crate::model::pool::{LiquidityInfo, LiquidityStatus, PoolState, PriceInfo, ProtocolKind};
        use crate::model::token::TokenInfo;
        use alloy_primitives::U256;

        Pool {
            address: address_from_u64(1),
            kind: ProtocolKind::V2,
            token0: TokenInfo::unknown(address_from_u64(2)),
            token1: TokenInfo::unknown(address_from_u64(3)),
            fee_bps: 2500,
            state: PoolState::V2 { reserve0: U256::from(1u64), reserve1: U256::from(1u64), block_timestamp: 0 },
            liquidity: LiquidityInfo {
                total_usd: 0.0,
                total_native: 0.0,
                token0_amount: 0.0,
                token1_amount: 0.0,
                status: LiquidityStatus::Empty,
                rug_reason: None,
            },
            price: PriceInfo {
                token0_price: 0.0,
                token1_price: 0.0,
                price_ratio: 0.0,
                in_usd: 0.0,
                in_native: 0.0,
                pair_token_symbol: "UNKNOWN".to_string(),
                display_price: 0.0,
                source: "v2".to_string(),
            },
            last_updated: 0i64,
        }
    }

    fn dummy_analysis() -> AnalysisResult {
        use crate::model::analysis::{AnalysisBreakdown, BestPools, Distribution, Meta, Performance, PerformanceGrade, PriceAnalysis, Summary, TotalLiquidity};
        use crate::scoring::{PoolCosts, PoolScore, RiskLevel, SafetyReport, SandwichRisk};
        use crate::utils::math::AggregatedPrice;

        AnalysisResult {
            token: TokenInfo::unknown(address_from_u64(1)),
            summary: Summary { pool_count: 0, active_pool_count: 0, rugged_pool_count: 0 },
            best_pools: BestPools {
                by_liquidity: None,
                by_price_usd: None,
                by_price_native: None,
                by_fee: None,
                by_protocol: std::collections::HashMap::new(),
                recommended: PoolScore {
                    pool_address: alloy_primitives::Address::ZERO,
                    score: 0.0,
                    costs: PoolCosts { fee_pct: 0.0, slippage_pct: 0.0, total_cost_pct: 0.0, cost_usd: 0.0 },
                    tradeable: false,
                    risk_level: RiskLevel::Critical,
                    safety: SafetyReport { score: 0, flags: Vec::new(), is_untradeable: true, sandwich_risk: SandwichRisk::None },
                    reason: Some("No optimal pool found".to_string()),
                },
            },
            pools: Vec::new(),
            analysis: AnalysisBreakdown {
                total_liquidity: TotalLiquidity { usd: 0.0, native: 0.0 },
                price_analysis: PriceAnalysis { aggregated: AggregatedPrice::default(), per_pair: Vec::new(), spread_pct: 0.0 },
                distribution: Distribution::default(),
            },
            performance: Performance { total_ms: 0, grade: PerformanceGrade::APlus },
            meta: Meta {
                timestamp: 0,
                cached: false,
                cache_age_ms: None,
                deduplicated: false,
                prices_stale: false,
                partial_results: false,
                protocol_status: std::collections::HashMap::new(),
            },
            warnings: Vec::new(),
        }
    }
}
