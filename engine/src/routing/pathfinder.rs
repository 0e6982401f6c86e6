//! 2-hop/3-hop route search and scoring (§4.11). Grounded on the teacher's
//! `routing/multi_hop.rs` (candidate-intermediate search) and
//! `routing/single_hop.rs` (direct-leg selection + price-impact formula),
//! generalized from a standing [`PoolGraph`] walk to a search over two (or
//! three) already-fetched [`AnalysisResult`]s.

use alloy_primitives::Address;

use crate::config::contracts::BaseTokens;
use crate::model::analysis::AnalysisResult;
use crate::model::pool::Pool;
use crate::routing::route::{Route, RouteHop, RouteKind};

/// Picks the best pool in `pools` pairing `target` against `other`: max
/// `liquidityUSD`; within a $1 000 tie, min `fee_bps` (§4.11 step 2).
fn pick_leg_pool<'a>(pools: &'a [Pool], target: Address, other: Address) -> Option<&'a Pool> {
    pools
        .iter()
        .filter(|p| !p.is_rugged() && p.contains_token(target) && p.contains_token(other) && matches!(p.liquidity.status, crate::model::pool::LiquidityStatus::Active | crate::model::pool::LiquidityStatus::WarningLiquidity))
        .fold(None::<&Pool>, |best, candidate| match best {
            None => Some(candidate),
            Some(b) => {
                let diff = (candidate.liquidity.total_usd - b.liquidity.total_usd).abs();
                if diff <= 1000.0 {
                    if candidate.fee_bps < b.fee_bps { Some(candidate) } else { Some(b) }
                } else if candidate.liquidity.total_usd > b.liquidity.total_usd {
                    Some(candidate)
                } else {
                    Some(b)
                }
            }
        })
}

/// Leg output estimate (§4.11): `out = amountIn × effectivePrice × (1 −
/// feeFrac) × (1 − priceImpactFrac)`, with `effectivePrice` read off the
/// pool's own USD side prices and `priceImpactFrac = min(0.5, swapValueUSD /
/// liquidityUSD)`.
fn build_hop(pool: &Pool, token_in: Address, amount_in: f64) -> RouteHop {
    let target_is_token0 = pool.token0.address == token_in;
    let (price_in, price_out) = if target_is_token0 { (pool.price.token0_price, pool.price.token1_price) } else { (pool.price.token1_price, pool.price.token0_price) };
    let effective_price = if price_out > 0.0 { price_in / price_out } else { 0.0 };
    let swap_value_usd = amount_in * price_in;
    let price_impact_frac = if pool.liquidity.total_usd > 0.0 { (swap_value_usd / pool.liquidity.total_usd).min(0.5) } else { 0.5 };
    let fee_frac = pool.fee_pct() / 100.0;
    let amount_out = amount_in * effective_price * (1.0 - fee_frac) * (1.0 - price_impact_frac);

    let token_out = if target_is_token0 { pool.token1.address } else { pool.token0.address };

    RouteHop::new(pool.address, token_in, token_out, pool.fee_bps, pool.liquidity.total_usd, amount_in, amount_out, price_impact_frac * 100.0)
}

/// Liquidity tier bonus, shared by the 2-hop and direct-route scoring ladder
/// (§4.11 "+50..+10 by min leg liquidity tier").
fn liquidity_bonus_2hop(min_liquidity_usd: f64) -> f64 {
    if min_liquidity_usd >= 1_000_000.0 {
        50.0
    } else if min_liquidity_usd >= 100_000.0 {
        35.0
    } else if min_liquidity_usd >= 10_000.0 {
        20.0
    } else {
        10.0
    }
}

fn fee_bonus_2hop(total_fee_bps: u32) -> f64 {
    if total_fee_bps <= 500 {
        20.0
    } else if total_fee_bps <= 1500 {
        12.0
    } else if total_fee_bps <= 3000 {
        8.0
    } else {
        5.0
    }
}

fn liquidity_bonus_3hop(min_liquidity_usd: f64) -> f64 {
    if min_liquidity_usd >= 1_000_000.0 {
        25.0
    } else if min_liquidity_usd >= 100_000.0 {
        18.0
    } else if min_liquidity_usd >= 10_000.0 {
        10.0
    } else {
        5.0
    }
}

fn fee_bonus_3hop(total_fee_bps: u32) -> f64 {
    if total_fee_bps <= 500 {
        15.0
    } else if total_fee_bps <= 1500 {
        10.0
    } else if total_fee_bps <= 3000 {
        7.0
    } else {
        5.0
    }
}

fn score_route(kind: RouteKind, hops: &[RouteHop]) -> f64 {
    let min_liquidity = hops.iter().map(|h| h.liquidity_usd).fold(f64::INFINITY, f64::min);
    let total_fee_bps: u32 = hops.iter().map(|h| h.fee_bps).sum();
    let total_impact_pct: f64 = hops.iter().map(|h| h.price_impact_pct).sum();

    match kind {
        RouteKind::Direct => 100.0 + liquidity_bonus_2hop(min_liquidity) + fee_bonus_2hop(total_fee_bps) - 5.0 * total_impact_pct + 40.0,
        RouteKind::TwoHop => 100.0 + liquidity_bonus_2hop(min_liquidity) + fee_bonus_2hop(total_fee_bps) - 5.0 * total_impact_pct,
        RouteKind::ThreeHop => 70.0 + liquidity_bonus_3hop(min_liquidity) + fee_bonus_3hop(total_fee_bps) - 7.0 * total_impact_pct,
    }
}

fn finish_route(kind: RouteKind, hops: Vec<RouteHop>, token_in: Address, token_out: Address, amount_in: f64) -> Route {
    let amount_out = hops.last().map(|h| h.amount_out).unwrap_or(0.0);
    let total_price_impact_pct = hops.iter().map(|h| h.price_impact_pct).sum();
    let total_fee_bps = hops.iter().map(|h| h.fee_bps).sum();
    let score = score_route(kind, &hops);
    Route { kind, hops, token_in, token_out, amount_in, amount_out, total_price_impact_pct, total_fee_bps, score }
}

/// Direct route: the best pool pairing `token_in` directly with `token_out`,
/// read from `token_in`'s own analysis (§4.11 step 3).
pub fn find_direct_route(token_in_analysis: &AnalysisResult, token_in: Address, token_out: Address, amount_in: f64) -> Option<Route> {
    let pool = pick_leg_pool(&token_in_analysis.pools, token_in, token_out)?;
    let hop = build_hop(pool, token_in, amount_in);
    Some(finish_route(RouteKind::Direct, vec![hop], token_in, token_out, amount_in))
}

/// 2-hop routes through every base in `bases`, each leg picked independently
/// from `token_in`'s and `token_out`'s own analyses (§4.11 step 2).
pub fn find_two_hop_routes(token_in_analysis: &AnalysisResult, token_out_analysis: &AnalysisResult, token_in: Address, token_out: Address, amount_in: f64, bases: &[Address]) -> Vec<Route> {
    let mut routes = Vec::new();
    for &base in bases {
        if base == token_in || base == token_out {
            continue;
        }
        let leg1_pool = match pick_leg_pool(&token_in_analysis.pools, token_in, base) {
            Some(p) => p,
            None => continue,
        };
        let leg2_pool = match pick_leg_pool(&token_out_analysis.pools, token_out, base) {
            Some(p) => p,
            None => continue,
        };

        let hop1 = build_hop(leg1_pool, token_in, amount_in);
        // token_out's analysis prices the pool from token_out's perspective, so the
        // second leg runs "backwards" (base -> token_out) using hop1's output as input.
        let hop2 = build_hop(leg2_pool, base, hop1.amount_out);
        let hop2 = RouteHop { token_in: base, token_out, ..hop2 };

        routes.push(finish_route(RouteKind::TwoHop, vec![hop1, hop2], token_in, token_out, amount_in));
    }
    routes
}

/// 3-hop `token_in -> primary -> secondary -> token_out` routes (§4.11 step
/// 4). The middle leg needs `primary`'s own analysis (or, failing that,
/// `secondary`'s), since neither endpoint's analysis prices a pair that
/// doesn't include the endpoint itself.
pub async fn find_three_hop_routes<A, Fut>(
    token_in_analysis: &AnalysisResult,
    token_out_analysis: &AnalysisResult,
    token_in: Address,
    token_out: Address,
    amount_in: f64,
    analyze: A,
) -> Vec<Route>
where
    A: Fn(Address) -> Fut,
    Fut: std::future::Future<Output = Option<AnalysisResult>>,
{
    let mut routes = Vec::new();
    for primary in BaseTokens::primary() {
        let primary_addr = primary.parsed_address();
        if primary_addr == token_in || primary_addr == token_out {
            continue;
        }
        for secondary in BaseTokens::secondary() {
            let secondary_addr = secondary.parsed_address();
            if secondary_addr == token_in || secondary_addr == token_out {
                continue;
            }

            let leg1_pool = match pick_leg_pool(&token_in_analysis.pools, token_in, primary_addr) {
                Some(p) => p.clone(),
                None => continue,
            };
            let leg3_pool = match pick_leg_pool(&token_out_analysis.pools, token_out, secondary_addr) {
                Some(p) => p.clone(),
                None => continue,
            };

            let middle_pool = if let Some(primary_analysis) = analyze(primary_addr).await {
                pick_leg_pool(&primary_analysis.pools, primary_addr, secondary_addr).cloned()
            } else {
                None
            };
            let middle_pool = match middle_pool {
                Some(p) => p,
                None => match analyze(secondary_addr).await {
                    Some(secondary_analysis) => match pick_leg_pool(&secondary_analysis.pools, secondary_addr, primary_addr) {
                        Some(p) => p.clone(),
                        None => continue,
                    },
                    None => continue,
                },
            };

            let hop1 = build_hop(&leg1_pool, token_in, amount_in);
            let hop2 = build_hop(&middle_pool, primary_addr, hop1.amount_out);
            let hop2 = RouteHop { token_in: primary_addr, token_out: secondary_addr, ..hop2 };
            let hop3 = build_hop(&leg3_pool, secondary_addr, hop2.amount_out);
            let hop3 = RouteHop { token_in: secondary_addr, token_out, ..hop3 };

            routes.push(finish_route(RouteKind::ThreeHop, vec![hop1, hop2, hop3], token_in, token_out, amount_in));
        }
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pool::{LiquidityInfo, LiquidityStatus, PoolState, PriceInfo, ProtocolKind};
    use crate::model::token::TokenInfo;
    use crate::utils::types::address_from_u64;
    use alloy_primitives::U256;

    fn make_pool(addr: Address, token_a: Address, token_b: Address, liquidity_usd: f64, fee_bps: u32) -> Pool {
        Pool {
            address: addr,
            kind: ProtocolKind::V2,
            token0: TokenInfo::new(token_a, "A", "A", 18),
            token1: TokenInfo::new(token_b, "B", "B", 18),
            fee_bps,
            state: PoolState::V2 { reserve0: U256::from(1u64), reserve1: U256::from(1u64), block_timestamp: 0 },
            liquidity: LiquidityInfo { total_usd: liquidity_usd, total_native: liquidity_usd / 3000.0, token0_amount: 1000.0, token1_amount: 1000.0, status: LiquidityStatus::Active, rug_reason: None },
            price: PriceInfo { token0_price: 1.0, token1_price: 1.0, price_ratio: 1.0, in_usd: 1.0, in_native: 1.0 / 3000.0, pair_token_symbol: "B".to_string(), display_price: 1.0, source: "v2".to_string() },
            last_updated: 0,
        }
    }

    #[test]
    fn pick_leg_pool_prefers_higher_liquidity_outside_tie_band() {
        let a = address_from_u64(1);
        let b = address_from_u64(2);
        let low = make_pool(address_from_u64(10), a, b, 5_000.0, 3000);
        let high = make_pool(address_from_u64(11), a, b, 50_000.0, 3000);
        let pools = vec![low, high.clone()];
        let best = pick_leg_pool(&pools, a, b).unwrap();
        assert_eq!(best.address, high.address);
    }

    #[test]
    fn pick_leg_pool_breaks_tie_within_1000_by_fee() {
        let a = address_from_u64(1);
        let b = address_from_u64(2);
        let expensive = make_pool(address_from_u64(10), a, b, 10_000.0, 3000);
        let cheap = make_pool(address_from_u64(11), a, b, 10_500.0, 500);
        let pools = vec![expensive, cheap.clone()];
        let best = pick_leg_pool(&pools, a, b).unwrap();
        assert_eq!(best.address, cheap.address);
    }

    #[test]
    fn direct_route_scores_higher_than_two_hop_all_else_equal() {
        let hops = vec![build_hop(&make_pool(address_from_u64(1), address_from_u64(2), address_from_u64(3), 100_000.0, 500), address_from_u64(2), 1000.0)];
        let direct_score = score_route(RouteKind::Direct, &hops);
        let two_hop_score = score_route(RouteKind::TwoHop, &hops);
        assert!(direct_score > two_hop_score);
    }
}
