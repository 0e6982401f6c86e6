//! Warnings generator (§4.10): walks a formed analysis and emits
//! CRITICAL-to-LOW sorted warnings. No teacher equivalent; grounded on the
//! same tiered-threshold style as `scoring::run_safety_checks`.

use alloy_primitives::Address;

use crate::config::contracts::BaseTokens;
use crate::model::analysis::PriceAnalysis;
use crate::model::pool::{LiquidityStatus, Pool, ProtocolKind};
use crate::model::warning::{Severity, Warning};
use crate::scoring::PoolScore;

#[allow(clippy::too_many_arguments)]
pub fn generate_warnings(
    pools: &[Pool],
    recommended: &PoolScore,
    price_analysis: &PriceAnalysis,
    partial_results: bool,
    prices_stale: bool,
    total_ms: u64,
    target_token: Address,
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if partial_results {
        warnings.push(Warning::new("PARTIAL_RESULTS", Severity::Medium, "one or more protocol fetches failed; results may be incomplete".to_string()));
    }
    if prices_stale {
        warnings.push(Warning::new("STALE_PRICES", Severity::Medium, "price oracle data is older than the staleness threshold".to_string()));
    }
    if total_ms > 2000 {
        warnings.push(Warning::new("SLOW_RESPONSE", Severity::Low, format!("analysis took {total_ms}ms")));
    }

    let active_count = pools
        .iter()
        .filter(|p| matches!(p.liquidity.status, LiquidityStatus::Active | LiquidityStatus::WarningLiquidity))
        .count();
    if active_count == 0 {
        warnings.push(Warning::new("NO_ACTIVE_POOLS", Severity::Critical, "no pool has sufficient liquidity to be considered active".to_string()));
    }
    if active_count == 1 {
        warnings.push(Warning::new("SINGLE_POOL", Severity::Medium, "only one pool is active for this token".to_string()));
    }

    let has_rug_pull = pools.iter().any(|p| {
        let Some(pair_token) = p.other_token(target_token) else {
            return false;
        };
        let pair_amount = if p.token0.address == pair_token.address { p.liquidity.token0_amount } else { p.liquidity.token1_amount };
        let target_amount = if p.token0.address == target_token { p.liquidity.token0_amount } else { p.liquidity.token1_amount };
        let min_reserve = BaseTokens::min_pair_reserve(&pair_token.symbol);
        pair_amount < min_reserve && target_amount > 0.0
    });
    if has_rug_pull {
        warnings.push(Warning::new("RUG_PULL_DETECTED", Severity::Critical, "a pool's pair-side reserves fell below the safe minimum while the target side held balance".to_string()));
    }
    if pools.iter().any(|p| p.kind == ProtocolKind::V3 && p.liquidity.status == LiquidityStatus::Rugged) {
        warnings.push(Warning::new("V3_RUGGED_POOLS", Severity::Critical, "one or more V3 pools are flagged RUGGED".to_string()));
    }

    if let Some(best_pool) = pools.iter().find(|p| p.address == recommended.pool_address) {
        let usd = best_pool.liquidity.total_usd;
        if usd < 1000.0 {
            warnings.push(Warning::new("EXTREMELY_LOW_LIQUIDITY", Severity::Critical, format!("recommended pool holds only ${usd:.2}")));
        } else if usd < 10_000.0 {
            warnings.push(Warning::new("LOW_LIQUIDITY", Severity::High, format!("recommended pool holds ${usd:.2}")));
        } else if usd < 50_000.0 {
            warnings.push(Warning::new("MODERATE_LIQUIDITY", Severity::Medium, format!("recommended pool holds ${usd:.2}")));
        }
    }

    let slippage = recommended.costs.slippage_pct;
    if slippage > 5.0 {
        warnings.push(Warning::new("EXTREME_SLIPPAGE", Severity::Critical, format!("recommended pool's estimated slippage is {slippage:.2}%")));
    } else if slippage > 2.0 {
        warnings.push(Warning::new("HIGH_SLIPPAGE", Severity::High, format!("recommended pool's estimated slippage is {slippage:.2}%")));
    } else if slippage > 1.0 {
        warnings.push(Warning::new("MODERATE_SLIPPAGE", Severity::Medium, format!("recommended pool's estimated slippage is {slippage:.2}%")));
    }

    if price_analysis.spread_pct > 10.0 {
        warnings.push(Warning::new("PRICE_SPREAD_HIGH", Severity::High, format!("cross-pool price spread is {:.2}%", price_analysis.spread_pct)));
    } else if price_analysis.spread_pct > 5.0 {
        warnings.push(Warning::new("PRICE_SPREAD_MODERATE", Severity::Medium, format!("cross-pool price spread is {:.2}%", price_analysis.spread_pct)));
    }

    Warning::sort_by_severity(&mut warnings);
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::analysis::PriceAnalysis;
    use crate::model::pool::{LiquidityInfo, PoolState, PriceInfo};
    use crate::model::token::TokenInfo;
    use crate::utils::math::AggregatedPrice;
    use crate::utils::types::address_from_u64;
    use alloy_primitives::U256;

    fn price_analysis(spread_pct: f64) -> PriceAnalysis {
        PriceAnalysis { aggregated: AggregatedPrice::default(), per_pair: Vec::new(), spread_pct }
    }

    fn recommended_for(pool_address: Address) -> PoolScore {
        PoolScore {
            pool_address,
            score: 0.0,
            costs: crate::scoring::PoolCosts { fee_pct: 0.0, slippage_pct: 0.0, total_cost_pct: 0.0, cost_usd: 0.0 },
            tradeable: false,
            risk_level: crate::scoring::RiskLevel::Critical,
            safety: crate::scoring::SafetyReport { score: 0, flags: Vec::new(), is_untradeable: true, sandwich_risk: crate::scoring::SandwichRisk::None },
            reason: Some("No optimal pool found".to_string()),
        }
    }

    #[test]
    fn no_pools_triggers_no_active_pools_critical() {
        let target = address_from_u64(2);
        let recommended = recommended_for(address_from_u64(1));
        let warnings = generate_warnings(&[], &recommended, &price_analysis(0.0), false, false, 100, target);
        assert!(warnings.iter().any(|w| w.code == "NO_ACTIVE_POOLS"));
        assert_eq!(warnings[0].severity, Severity::Critical);
    }

    /// §8 scenario 3: a V2 pool whose pair-side (wrapper) reserve sits below
    /// its 0.001 floor while the target side holds balance must surface
    /// `RUG_PULL_DETECTED`, even though no pool carries a `rug_reason` (that
    /// field is set only by the V3 tick/zero-liquidity path).
    #[test]
    fn v2_rug_pull_reserve_triggers_warning() {
        let target = address_from_u64(2);
        let wrapper = address_from_u64(3);
        let pool = Pool {
            address: address_from_u64(1),
            kind: ProtocolKind::V2,
            token0: TokenInfo::new(target, "TGT", "Target", 18),
            token1: TokenInfo::new(wrapper, "WETH", "Wrapped Ether", 18),
            fee_bps: 3000,
            state: PoolState::V2 { reserve0: U256::from(1_000_000u64), reserve1: U256::from(1u64), block_timestamp: 0 },
            liquidity: LiquidityInfo {
                total_usd: 1.0,
                total_native: 0.0001,
                token0_amount: 1_000_000.0,
                token1_amount: 0.0001,
                status: LiquidityStatus::LowLiquidity,
                rug_reason: None,
            },
            price: PriceInfo {
                token0_price: 0.0000001,
                token1_price: 0.0,
                price_ratio: 0.0000001,
                in_usd: 0.0003,
                in_native: 0.0000001,
                pair_token_symbol: "WETH".to_string(),
                display_price: 0.0000001,
                source: "v2".to_string(),
            },
            last_updated: 0,
        };
        let recommended = recommended_for(pool.address);
        let warnings = generate_warnings(std::slice::from_ref(&pool), &recommended, &price_analysis(0.0), false, false, 100, target);
        assert!(warnings.iter().any(|w| w.code == "RUG_PULL_DETECTED" && w.severity == Severity::Critical));
    }
}
