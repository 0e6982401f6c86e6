//! Route/leg/quote value types (§4.11). Grounded on the teacher's
//! `routing/route.rs` (`RouteHop`/`Route`/`SplitRoute`), generalized from a
//! `PoolEdge`-addressed hop to one priced off a live [`Pool`] snapshot.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::model::pool::Pool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteHop {
    pub pool_address: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub fee_bps: u32,
    pub liquidity_usd: f64,
    pub amount_in: f64,
    pub amount_out: f64,
    pub price_impact_pct: f64,
}

impl RouteHop {
    pub fn new(pool_address: Address, token_in: Address, token_out: Address, fee_bps: u32, liquidity_usd: f64, amount_in: f64, amount_out: f64, price_impact_pct: f64) -> Self {
        Self { pool_address, token_in, token_out, fee_bps, liquidity_usd, amount_in, amount_out, price_impact_pct }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteKind {
    Direct,
    TwoHop,
    ThreeHop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub kind: RouteKind,
    pub hops: Vec<RouteHop>,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: f64,
    pub amount_out: f64,
    pub total_price_impact_pct: f64,
    pub total_fee_bps: u32,
    pub score: f64,
}

impl Route {
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// `token_in -> token_out` via each intermediate pair token, for display.
    pub fn path_symbols(&self, symbol_of: impl Fn(Address) -> String) -> String {
        if self.hops.is_empty() {
            return String::new();
        }
        let mut parts = vec![symbol_of(self.hops[0].token_in)];
        for hop in &self.hops {
            parts.push(symbol_of(hop.token_out));
        }
        parts.join(" -> ")
    }
}

/// `GET/POST quote` response shape (§6): a single best-effort direct quote
/// with a slippage-adjusted minimum out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub pool_address: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: f64,
    pub amount_out: f64,
    pub min_amount_out: f64,
    pub slippage_pct: f64,
    pub price_impact_pct: f64,
    pub fee_bps: u32,
}

impl Quote {
    pub fn from_pool(pool: &Pool, token_in: Address, amount_in: f64, slippage_pct: f64) -> Self {
        let target_is_token0 = pool.token0.address == token_in;
        let (price_in, price_out) = if target_is_token0 { (pool.price.token0_price, pool.price.token1_price) } else { (pool.price.token1_price, pool.price.token0_price) };
        let effective_price = if price_out > 0.0 { price_in / price_out } else { 0.0 };
        let swap_value_usd = amount_in * price_in;
        let price_impact_frac = if pool.liquidity.total_usd > 0.0 { (swap_value_usd / pool.liquidity.total_usd).min(0.5) } else { 0.5 };
        let amount_out = amount_in * effective_price * (1.0 - pool.fee_pct() / 100.0) * (1.0 - price_impact_frac);
        let min_amount_out = amount_out * (1.0 - slippage_pct / 100.0);
        let token_out = pool.other_token(token_in).map(|t| t.address).unwrap_or(Address::ZERO);

        Self {
            pool_address: pool.address,
            token_in,
            token_out,
            amount_in,
            amount_out,
            min_amount_out,
            slippage_pct,
            price_impact_pct: price_impact_frac * 100.0,
            fee_bps: pool.fee_bps,
        }
    }
}
