//! Analyzer (§4.10): the orchestration seam the rest of the engine builds
//! toward — cache lookup, in-flight deduplication, Discovery → Pool Fetcher,
//! aggregation/scoring, warnings, and the cache write-back. No teacher
//! equivalent (the teacher's graph is always "already synced"); grounded on
//! the data-flow diagram in §2 and the component contracts of §4.6–§4.10.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::Address;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{FutureExt, Shared};

use crate::analysis::warnings::generate_warnings;
use crate::cache::EngineCache;
use crate::discovery::{Discovery, DiscoveryMode};
use crate::fetch::PoolFetcher;
use crate::model::analysis::{
    AnalysisBreakdown, AnalysisResult, BestPools, Distribution, Meta, PairGroup, Performance, PerformanceGrade, PriceAnalysis, Summary, TotalLiquidity,
};
use crate::model::pool::{LiquidityStatus, Pool};
use crate::pricing::PriceOracle;
use crate::scoring::{best_by_fee, best_by_liquidity, best_by_price_native, best_by_price_usd, best_by_protocol, select_recommended};
use crate::tokens::TokenRegistry;
use crate::utils::error::{EngineError, Result};
use crate::utils::math::{aggregate_prices, PriceSample};

type AnalysisFuture = Shared<Pin<Box<dyn Future<Output = std::result::Result<AnalysisResult, String>> + Send>>>;

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// `AnalyzeToken(addr, forceRefresh)` (§4.10).
pub struct Analyzer {
    cache: Arc<EngineCache>,
    token_registry: Arc<TokenRegistry>,
    price_oracle: Arc<PriceOracle>,
    discovery: Arc<Discovery>,
    fetcher: Arc<PoolFetcher>,
    default_trade_usd: f64,
    in_flight: DashMap<(Address, bool), AnalysisFuture>,
}

impl Analyzer {
    pub fn new(
        cache: Arc<EngineCache>,
        token_registry: Arc<TokenRegistry>,
        price_oracle: Arc<PriceOracle>,
        discovery: Arc<Discovery>,
        fetcher: Arc<PoolFetcher>,
        default_trade_usd: f64,
    ) -> Self {
        Self {
            cache,
            token_registry,
            price_oracle,
            discovery,
            fetcher,
            default_trade_usd,
            in_flight: DashMap::new(),
        }
    }

    /// Steps 1-4 of §4.10: cache check, dedup, and force-refresh
    /// invalidation, before delegating the actual fetch/score pipeline to
    /// [`Self::do_analyze`].
    pub async fn analyze(self: &Arc<Self>, addr: Address, force_refresh: bool) -> Result<AnalysisResult> {
        if force_refresh {
            self.cache.clear_token_analysis(addr);
        } else if let Some((mut cached, age)) = self.cache.get_analysis_with_age(addr) {
            cached.meta.cached = true;
            cached.meta.cache_age_ms = Some(age.as_millis() as u64);
            return Ok(cached);
        }

        let key = (addr, force_refresh);

        let shared = match self.in_flight.entry(key) {
            Entry::Occupied(occupied) => {
                let fut = occupied.get().clone();
                drop(occupied);
                let mut result = fut.await.map_err(EngineError::Internal)?;
                result.meta.deduplicated = true;
                return Ok(result);
            }
            Entry::Vacant(vacant) => {
                let this = Arc::clone(self);
                let fut: AnalysisFuture = async move { this.do_analyze(addr).await.map_err(|e| e.to_string()) }.boxed().shared();
                vacant.insert(fut.clone());
                fut
            }
        };

        let result = shared.await;
        self.in_flight.remove(&key);
        result.map_err(EngineError::Internal)
    }

    async fn do_analyze(&self, addr: Address) -> Result<AnalysisResult> {
        let start = Instant::now();

        let token = self.token_registry.get_token_info(addr).await?;

        let prices_stale = self.price_oracle.are_stale();
        if prices_stale {
            let oracle = Arc::clone(&self.price_oracle);
            tokio::spawn(async move {
                if let Err(err) = oracle.refresh_from_chain().await {
                    tracing::warn!(error = %err, "price oracle refresh failed, reusing cached values");
                }
            });
        }

        let candidates = self.discovery.discover(addr, DiscoveryMode::Full).await?;
        let outcome = self.fetcher.fetch(addr, candidates).await?;

        let samples: Vec<PriceSample> = outcome
            .pools
            .iter()
            .filter(|p| !p.is_rugged() && p.price.in_usd > 0.0)
            .map(|p| PriceSample {
                price_usd: p.price.in_usd,
                price_native: p.price.in_native,
                liquidity_usd: p.liquidity.total_usd,
                liquidity_native: p.liquidity.total_native,
            })
            .collect();
        let aggregated = aggregate_prices(&samples);

        let (_scores, recommended) = select_recommended(&outcome.pools, addr, self.default_trade_usd, aggregated.avg_price_usd);

        let best_pools = BestPools {
            by_liquidity: best_by_liquidity(&outcome.pools),
            by_price_usd: best_by_price_usd(&outcome.pools),
            by_price_native: best_by_price_native(&outcome.pools),
            by_fee: best_by_fee(&outcome.pools),
            by_protocol: best_by_protocol(&outcome.pools),
            recommended: recommended.clone(),
        };

        let total_liquidity = TotalLiquidity {
            usd: outcome.pools.iter().filter(|p| !p.is_rugged()).map(|p| p.liquidity.total_usd).sum(),
            native: outcome.pools.iter().filter(|p| !p.is_rugged()).map(|p| p.liquidity.total_native).sum(),
        };

        let spread_pct = if aggregated.avg_price_usd > 0.0 {
            (aggregated.max_price_usd - aggregated.min_price_usd) / aggregated.avg_price_usd * 100.0
        } else {
            0.0
        };
        let price_analysis = PriceAnalysis { aggregated, per_pair: group_per_pair(&outcome.pools, addr), spread_pct };

        let analysis = AnalysisBreakdown { total_liquidity, price_analysis, distribution: build_distribution(&outcome.pools) };

        let active_pool_count = outcome
            .pools
            .iter()
            .filter(|p| matches!(p.liquidity.status, LiquidityStatus::Active | LiquidityStatus::WarningLiquidity))
            .count();
        let rugged_pool_count = outcome.pools.iter().filter(|p| p.is_rugged()).count();
        let summary = Summary { pool_count: outcome.pools.len(), active_pool_count, rugged_pool_count };

        let total_ms = start.elapsed().as_millis() as u64;
        let performance = Performance { total_ms, grade: PerformanceGrade::from_total_ms(total_ms) };

        let warnings = generate_warnings(&outcome.pools, &recommended, &analysis.price_analysis, outcome.partial_results, prices_stale, total_ms, addr);

        let meta = Meta {
            timestamp: now_millis(),
            cached: false,
            cache_age_ms: None,
            deduplicated: false,
            prices_stale,
            partial_results: outcome.partial_results,
            protocol_status: outcome.status,
        };

        let result = AnalysisResult { token, summary, best_pools, pools: outcome.pools, analysis, performance, meta, warnings };

        self.cache.set_analysis(addr, result.clone());
        Ok(result)
    }
}

/// Groups non-rugged pools by pair-token symbol for the per-pair price
/// breakdown (§4.8 aggregation, "per-pair list preserved").
fn group_per_pair(pools: &[Pool], target: Address) -> Vec<PairGroup> {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for pool in pools.iter().filter(|p| !p.is_rugged() && p.price.in_usd > 0.0) {
        let symbol = pool.other_token(target).map(|t| t.symbol.clone()).unwrap_or_else(|| "UNKNOWN".to_string());
        let entry = groups.entry(symbol).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += pool.price.in_usd;
    }

    groups
        .into_iter()
        .map(|(pair_symbol, (pool_count, sum_usd))| PairGroup {
            pair_symbol,
            pool_count,
            avg_price_usd: if pool_count > 0 { sum_usd / pool_count as f64 } else { 0.0 },
        })
        .collect()
}

fn build_distribution(pools: &[Pool]) -> Distribution {
    let mut distribution = Distribution::default();
    for pool in pools {
        *distribution.by_protocol.entry(pool.kind).or_insert(0) += 1;
        let status_key = format!("{:?}", pool.liquidity.status).to_uppercase();
        *distribution.by_status.entry(status_key).or_insert(0) += 1;
    }
    distribution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pool::{LiquidityInfo, LiquidityStatus, PoolState, PriceInfo, ProtocolKind};
    use crate::model::token::TokenInfo;
    use crate::utils::types::address_from_u64;
    use alloy_primitives::U256;

    fn make_pool(pair_symbol: &str, in_usd: f64, status: LiquidityStatus, kind: ProtocolKind) -> Pool {
        Pool {
            address: address_from_u64(1),
            kind,
            token0: TokenInfo::new(address_from_u64(2), "TGT", "Target", 18),
            token1: TokenInfo::new(address_from_u64(3), pair_symbol, pair_symbol, 18),
            fee_bps: 3000,
            state: PoolState::V2 { reserve0: U256::from(1u64), reserve1: U256::from(1u64), block_timestamp: 0 },
            liquidity: LiquidityInfo { total_usd: 1000.0, total_native: 1.0, token0_amount: 1.0, token1_amount: 1.0, status, rug_reason: None },
            price: PriceInfo {
                token0_price: in_usd,
                token1_price: 0.0,
                price_ratio: 1.0,
                in_usd,
                in_native: 0.0,
                pair_token_symbol: pair_symbol.to_string(),
                display_price: in_usd,
                source: "v2".to_string(),
            },
            last_updated: 0,
        }
    }

    #[test]
    fn group_per_pair_averages_by_symbol() {
        let target = address_from_u64(2);
        let pools = vec![
            make_pool("WETH", 10.0, LiquidityStatus::Active, ProtocolKind::V2),
            make_pool("WETH", 20.0, LiquidityStatus::Active, ProtocolKind::V2),
            make_pool("USDC", 5.0, LiquidityStatus::Active, ProtocolKind::V3),
        ];
        let groups = group_per_pair(&pools, target);
        let weth = groups.iter().find(|g| g.pair_symbol == "WETH").unwrap();
        assert_eq!(weth.pool_count, 2);
        assert!((weth.avg_price_usd - 15.0).abs() < 1e-9);
    }

    #[test]
    fn build_distribution_counts_by_protocol_and_status() {
        let target = address_from_u64(2);
        let pools = vec![
            make_pool("WETH", 10.0, LiquidityStatus::Active, ProtocolKind::V2),
            make_pool("WETH", 0.0, LiquidityStatus::Empty, ProtocolKind::V3),
        ];
        let _ = target;
        let distribution = build_distribution(&pools);
        assert_eq!(distribution.by_protocol[&ProtocolKind::V2], 1);
        assert_eq!(distribution.by_protocol[&ProtocolKind::V3], 1);
        assert_eq!(distribution.by_status["ACTIVE"], 1);
        assert_eq!(distribution.by_status["EMPTY"], 1);
    }
}
