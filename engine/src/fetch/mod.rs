//! Pool Fetcher (§4.7): turns discovery candidates into fully enriched
//! [`Pool`]s, with a partial-failure model per protocol and a chunked
//! sequential fallback when both protocol batches fail outright. Grounded
//! on the teacher's `sync/pool_sync.rs` pool-population step, generalized
//! from synthesized reserves to live `getReserves`/`slot0`/`balanceOf`
//! reads.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Address, Uint, U256};
use alloy_sol_types::SolCall;

use crate::discovery::PoolCandidate;
use crate::model::analysis::{ProtocolFetchStatus, ProtocolStatusEntry};
use crate::model::pool::{LiquidityInfo, Pool, PoolState, PriceInfo, ProtocolKind};
use crate::model::token::TokenInfo;
use crate::pricing::PriceOracle;
use crate::rpc::abi::{IERC20, IUniswapV2Pair, IUniswapV3Pool};
use crate::rpc::batch::{BatchCaller, CallResult, PendingCall};
use crate::tokens::TokenRegistry;
use crate::utils::error::Result;
use crate::utils::math::{calc_sqrt_price_to_price, calc_v2_price};
use crate::utils::types::{MAX_TICK, MIN_TICK, RUG_TICK_MARGIN};

const FALLBACK_CHUNK_SIZE: usize = 8;

pub struct FetchOutcome {
    pub pools: Vec<Pool>,
    pub status: HashMap<ProtocolKind, ProtocolStatusEntry>,
    pub partial_results: bool,
}

pub struct PoolFetcher {
    batch_caller: Arc<BatchCaller>,
    token_registry: Arc<TokenRegistry>,
    price_oracle: Arc<PriceOracle>,
}

/// Raw decode of one V2 candidate before token metadata / pricing.
struct RawV2 {
    address: Address,
    token0_addr: Address,
    token1_addr: Address,
    reserve0: U256,
    reserve1: U256,
    block_timestamp: u32,
}

/// Raw decode of one V3 candidate before token metadata / pricing.
struct RawV3 {
    address: Address,
    token0_addr: Address,
    token1_addr: Address,
    fee_bps: u32,
    liquidity: u128,
    sqrt_price_x96: U256,
    tick: i32,
    balance0: U256,
    balance1: U256,
}

impl PoolFetcher {
    pub fn new(batch_caller: Arc<BatchCaller>, token_registry: Arc<TokenRegistry>, price_oracle: Arc<PriceOracle>) -> Self {
        Self { batch_caller, token_registry, price_oracle }
    }

    pub async fn fetch(&self, target: Address, candidates: Vec<PoolCandidate>) -> Result<FetchOutcome> {
        let v2_candidates: Vec<PoolCandidate> = candidates.iter().filter(|c| c.kind == ProtocolKind::V2).cloned().collect();
        let v3_candidates: Vec<PoolCandidate> = candidates.iter().filter(|c| c.kind == ProtocolKind::V3).cloned().collect();

        let (v2_raw, v3_raw) = tokio::join!(self.decode_v2(&v2_candidates), self.decode_v3(&v3_candidates));

        let mut status = HashMap::new();
        let mut partial = false;
        let mut all_v2: Vec<RawV2> = Vec::new();
        let mut all_v3: Vec<RawV3> = Vec::new();

        let v2_failed = v2_raw.is_err();
        let v3_failed = v3_raw.is_err();

        match v2_raw {
            Ok(raws) => {
                status.insert(
                    ProtocolKind::V2,
                    ProtocolStatusEntry { status: ProtocolFetchStatus::Success, pools: v2_candidates.len(), returned: raws.len(), error: None },
                );
                all_v2 = raws;
            }
            Err(e) => {
                partial = true;
                status.insert(
                    ProtocolKind::V2,
                    ProtocolStatusEntry { status: ProtocolFetchStatus::Failed, pools: v2_candidates.len(), returned: 0, error: Some(e.to_string()) },
                );
            }
        }

        match v3_raw {
            Ok(raws) => {
                status.insert(
                    ProtocolKind::V3,
                    ProtocolStatusEntry { status: ProtocolFetchStatus::Success, pools: v3_candidates.len(), returned: raws.len(), error: None },
                );
                all_v3 = raws;
            }
            Err(e) => {
                partial = true;
                status.insert(
                    ProtocolKind::V3,
                    ProtocolStatusEntry { status: ProtocolFetchStatus::Failed, pools: v3_candidates.len(), returned: 0, error: Some(e.to_string()) },
                );
            }
        }

        if v2_failed && v3_failed && (!v2_candidates.is_empty() || !v3_candidates.is_empty()) {
            let (fallback_v2, fallback_v3) = self.sequential_fallback(&v2_candidates, &v3_candidates).await;
            if !fallback_v2.is_empty() || !fallback_v3.is_empty() {
                all_v2 = fallback_v2;
                all_v3 = fallback_v3;
                status.insert(
                    ProtocolKind::V2,
                    ProtocolStatusEntry { status: ProtocolFetchStatus::Success, pools: v2_candidates.len(), returned: all_v2.len(), error: Some("recovered via sequential fallback".to_string()) },
                );
                status.insert(
                    ProtocolKind::V3,
                    ProtocolStatusEntry { status: ProtocolFetchStatus::Success, pools: v3_candidates.len(), returned: all_v3.len(), error: Some("recovered via sequential fallback".to_string()) },
                );
            }
        }

        let mut token_addrs: Vec<Address> = Vec::new();
        for raw in &all_v2 {
            token_addrs.push(raw.token0_addr);
            token_addrs.push(raw.token1_addr);
        }
        for raw in &all_v3 {
            token_addrs.push(raw.token0_addr);
            token_addrs.push(raw.token1_addr);
        }
        let tokens = self.token_registry.get_many(&token_addrs).await?;

        let mut pools = Vec::with_capacity(all_v2.len() + all_v3.len());
        for raw in all_v2 {
            pools.push(self.enrich_v2(target, raw, &tokens));
        }
        for raw in all_v3 {
            pools.push(self.enrich_v3(target, raw, &tokens));
        }

        Ok(FetchOutcome { pools, status, partial_results: partial })
    }

    async fn decode_v2(&self, candidates: &[PoolCandidate]) -> Result<Vec<RawV2>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let calls = build_v2_calls(candidates);
        let results = self.batch_caller.batch(calls).await?;
        Ok(decode_v2_results(candidates, &results))
    }

    async fn decode_v3(&self, candidates: &[PoolCandidate]) -> Result<Vec<RawV3>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let calls = build_v3_calls(candidates);
        let results = self.batch_caller.batch(calls).await?;
        let partial = decode_v3_partial(candidates, &results);

        let balance_calls: Vec<PendingCall> = partial
            .iter()
            .flat_map(|p| {
                vec![
                    PendingCall::new(p.token0_addr, IERC20::balanceOfCall { owner: p.address }.abi_encode()),
                    PendingCall::new(p.token1_addr, IERC20::balanceOfCall { owner: p.address }.abi_encode()),
                ]
            })
            .collect();
        let balance_results = if balance_calls.is_empty() { Vec::new() } else { self.batch_caller.batch(balance_calls).await? };

        Ok(apply_balances(partial, &balance_results))
    }

    /// Fallback when both whole-protocol batches fail: re-fetch in chunks of
    /// `FALLBACK_CHUNK_SIZE`, one batch per chunk, chunks processed in
    /// sequence rather than all at once.
    async fn sequential_fallback(&self, v2_candidates: &[PoolCandidate], v3_candidates: &[PoolCandidate]) -> (Vec<RawV2>, Vec<RawV3>) {
        let mut v2_out = Vec::new();
        for chunk in v2_candidates.chunks(FALLBACK_CHUNK_SIZE) {
            if let Ok(raws) = self.decode_v2(chunk).await {
                v2_out.extend(raws);
            }
        }
        let mut v3_out = Vec::new();
        for chunk in v3_candidates.chunks(FALLBACK_CHUNK_SIZE) {
            if let Ok(raws) = self.decode_v3(chunk).await {
                v3_out.extend(raws);
            }
        }
        (v2_out, v3_out)
    }

    fn enrich_v2(&self, target: Address, raw: RawV2, tokens: &HashMap<Address, TokenInfo>) -> Pool {
        let token0 = tokens.get(&raw.token0_addr).cloned().unwrap_or_else(|| TokenInfo::unknown(raw.token0_addr));
        let token1 = tokens.get(&raw.token1_addr).cloned().unwrap_or_else(|| TokenInfo::unknown(raw.token1_addr));

        let fee_bps = 2500u32;
        let (price_ratio, _) = calc_v2_price(raw.reserve0, raw.reserve1, token0.decimals as i32, token1.decimals as i32);

        let amt0 = crate::utils::types::u256_ext::to_f64(raw.reserve0) / 10f64.powi(token0.decimals as i32);
        let amt1 = crate::utils::types::u256_ext::to_f64(raw.reserve1) / 10f64.powi(token1.decimals as i32);

        let total_usd = self.price_oracle.calc_pool_value_usd(token0.address, token1.address, amt0, amt1, price_ratio);
        let native_price = self.price_oracle.get_native_price_usd();
        let total_native = if native_price > 0.0 { total_usd / native_price } else { 0.0 };

        let reserves_are_zero = raw.reserve0.is_zero() && raw.reserve1.is_zero();
        let status = LiquidityInfo::status_from_usd(total_usd, reserves_are_zero);

        let liquidity = LiquidityInfo { total_usd, total_native, token0_amount: amt0, token1_amount: amt1, status, rug_reason: None };
        let price = build_price_info(target, &token0, &token1, price_ratio, &self.price_oracle, ProtocolKind::V2);

        Pool {
            address: raw.address,
            kind: ProtocolKind::V2,
            token0,
            token1,
            fee_bps,
            state: PoolState::V2 { reserve0: raw.reserve0, reserve1: raw.reserve1, block_timestamp: raw.block_timestamp },
            liquidity,
            price,
            last_updated: now_secs(),
        }
    }

    fn enrich_v3(&self, target: Address, raw: RawV3, tokens: &HashMap<Address, TokenInfo>) -> Pool {
        let token0 = tokens.get(&raw.token0_addr).cloned().unwrap_or_else(|| TokenInfo::unknown(raw.token0_addr));
        let token1 = tokens.get(&raw.token1_addr).cloned().unwrap_or_else(|| TokenInfo::unknown(raw.token1_addr));

        let rugged = raw.liquidity == 0 || (MAX_TICK - raw.tick).abs() <= RUG_TICK_MARGIN || (raw.tick - MIN_TICK).abs() <= RUG_TICK_MARGIN;

        if rugged {
            let liquidity = LiquidityInfo {
                total_usd: 0.0,
                total_native: 0.0,
                token0_amount: 0.0,
                token1_amount: 0.0,
                status: crate::model::pool::LiquidityStatus::Rugged,
                rug_reason: Some(if raw.liquidity == 0 { "zero liquidity".to_string() } else { "tick at range boundary".to_string() }),
            };
            return Pool {
                address: raw.address,
                kind: ProtocolKind::V3,
                token0,
                token1,
                fee_bps: raw.fee_bps,
                state: PoolState::V3 {
                    sqrt_price_x96: raw.sqrt_price_x96,
                    tick: raw.tick,
                    liquidity: raw.liquidity,
                    actual_balance0: raw.balance0,
                    actual_balance1: raw.balance1,
                },
                liquidity,
                price: PriceInfo {
                    token0_price: 0.0,
                    token1_price: 0.0,
                    price_ratio: 0.0,
                    in_usd: 0.0,
                    in_native: 0.0,
                    pair_token_symbol: "UNKNOWN".to_string(),
                    display_price: 0.0,
                    source: ProtocolKind::V3.as_str().to_string(),
                },
                last_updated: now_secs(),
            };
        }

        let price_ratio = calc_sqrt_price_to_price(raw.sqrt_price_x96, token0.decimals as i32, token1.decimals as i32);
        let amt0 = crate::utils::types::u256_ext::to_f64(raw.balance0) / 10f64.powi(token0.decimals as i32);
        let amt1 = crate::utils::types::u256_ext::to_f64(raw.balance1) / 10f64.powi(token1.decimals as i32);

        let total_usd = self.price_oracle.calc_pool_value_usd(token0.address, token1.address, amt0, amt1, price_ratio);
        let native_price = self.price_oracle.get_native_price_usd();
        let total_native = if native_price > 0.0 { total_usd / native_price } else { 0.0 };

        let reserves_are_zero = raw.balance0.is_zero() && raw.balance1.is_zero();
        let status = LiquidityInfo::status_from_usd(total_usd, reserves_are_zero);

        let liquidity = LiquidityInfo { total_usd, total_native, token0_amount: amt0, token1_amount: amt1, status, rug_reason: None };
        let price = build_price_info(target, &token0, &token1, price_ratio, &self.price_oracle, ProtocolKind::V3);

        Pool {
            address: raw.address,
            kind: ProtocolKind::V3,
            token0,
            token1,
            fee_bps: raw.fee_bps,
            state: PoolState::V3 {
                sqrt_price_x96: raw.sqrt_price_x96,
                tick: raw.tick,
                liquidity: raw.liquidity,
                actual_balance0: raw.balance0,
                actual_balance1: raw.balance1,
            },
            liquidity,
            price,
            last_updated: now_secs(),
        }
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// `in_usd`/`in_native` for the target token's direction in this pool, per
/// §4.7's Formatting step.
fn build_price_info(target: Address, token0: &TokenInfo, token1: &TokenInfo, price_ratio: f64, oracle: &PriceOracle, kind: ProtocolKind) -> PriceInfo {
    let (token0_usd, token1_usd) = oracle.infer_side_prices(token0.address, token1.address, price_ratio);
    let target_is_token0 = token0.address == target;
    let in_usd = if target_is_token0 { token0_usd } else { token1_usd };
    let native_price = oracle.get_native_price_usd();
    let in_native = if native_price > 0.0 { in_usd / native_price } else { 0.0 };
    let pair_token_symbol = if target_is_token0 { token1.symbol.clone() } else { token0.symbol.clone() };
    let display_price = if in_usd > 0.0 { in_usd } else { price_ratio };

    PriceInfo {
        token0_price: token0_usd,
        token1_price: token1_usd,
        price_ratio,
        in_usd,
        in_native,
        pair_token_symbol,
        display_price,
        source: kind.as_str().to_string(),
    }
}

fn build_v2_calls(candidates: &[PoolCandidate]) -> Vec<PendingCall> {
    let mut calls = Vec::with_capacity(candidates.len() * 3);
    for c in candidates {
        calls.push(PendingCall::new(c.address, IUniswapV2Pair::token0Call {}.abi_encode()));
        calls.push(PendingCall::new(c.address, IUniswapV2Pair::token1Call {}.abi_encode()));
        calls.push(PendingCall::new(c.address, IUniswapV2Pair::getReservesCall {}.abi_encode()));
    }
    calls
}

fn decode_v2_results(candidates: &[PoolCandidate], results: &[CallResult]) -> Vec<RawV2> {
    let mut out = Vec::with_capacity(candidates.len());
    for (i, c) in candidates.iter().enumerate() {
        let token0_r = &results[i * 3];
        let token1_r = &results[i * 3 + 1];
        let reserves_r = &results[i * 3 + 2];

        let token0_addr = token0_r.success.then(|| IUniswapV2Pair::token0Call::abi_decode_returns(&token0_r.return_data, true).ok()).flatten().map(|r| r._0);
        let token1_addr = token1_r.success.then(|| IUniswapV2Pair::token1Call::abi_decode_returns(&token1_r.return_data, true).ok()).flatten().map(|r| r._0);
        let reserves = reserves_r.success.then(|| IUniswapV2Pair::getReservesCall::abi_decode_returns(&reserves_r.return_data, true).ok()).flatten();

        if let (Some(token0_addr), Some(token1_addr), Some(reserves)) = (token0_addr, token1_addr, reserves) {
            out.push(RawV2 {
                address: c.address,
                token0_addr,
                token1_addr,
                reserve0: U256::from(reserves.reserve0),
                reserve1: U256::from(reserves.reserve1),
                block_timestamp: reserves.blockTimestampLast,
            });
        }
    }
    out
}

fn build_v3_calls(candidates: &[PoolCandidate]) -> Vec<PendingCall> {
    let mut calls = Vec::with_capacity(candidates.len() * 5);
    for c in candidates {
        calls.push(PendingCall::new(c.address, IUniswapV3Pool::token0Call {}.abi_encode()));
        calls.push(PendingCall::new(c.address, IUniswapV3Pool::token1Call {}.abi_encode()));
        calls.push(PendingCall::new(c.address, IUniswapV3Pool::feeCall {}.abi_encode()));
        calls.push(PendingCall::new(c.address, IUniswapV3Pool::liquidityCall {}.abi_encode()));
        calls.push(PendingCall::new(c.address, IUniswapV3Pool::slot0Call {}.abi_encode()));
    }
    calls
}

fn decode_v3_partial(candidates: &[PoolCandidate], results: &[CallResult]) -> Vec<RawV3> {
    let mut out = Vec::with_capacity(candidates.len());
    for (i, c) in candidates.iter().enumerate() {
        let token0_r = &results[i * 5];
        let token1_r = &results[i * 5 + 1];
        let fee_r = &results[i * 5 + 2];
        let liquidity_r = &results[i * 5 + 3];
        let slot0_r = &results[i * 5 + 4];

        let token0_addr = token0_r.success.then(|| IUniswapV3Pool::token0Call::abi_decode_returns(&token0_r.return_data, true).ok()).flatten().map(|r| r._0);
        let token1_addr = token1_r.success.then(|| IUniswapV3Pool::token1Call::abi_decode_returns(&token1_r.return_data, true).ok()).flatten().map(|r| r._0);
        let fee: Option<Uint<24, 1>> = fee_r.success.then(|| IUniswapV3Pool::feeCall::abi_decode_returns(&fee_r.return_data, true).ok()).flatten().map(|r| r._0);
        let liquidity = liquidity_r.success.then(|| IUniswapV3Pool::liquidityCall::abi_decode_returns(&liquidity_r.return_data, true).ok()).flatten().map(|r| r._0);
        let slot0 = slot0_r.success.then(|| IUniswapV3Pool::slot0Call::abi_decode_returns(&slot0_r.return_data, true).ok()).flatten();

        if let (Some(token0_addr), Some(token1_addr), Some(fee), Some(liquidity), Some(slot0)) = (token0_addr, token1_addr, fee, liquidity, slot0) {
            out.push(RawV3 {
                address: c.address,
                token0_addr,
                token1_addr,
                fee_bps: fee.to::<u32>(),
                liquidity,
                sqrt_price_x96: U256::from(slot0.sqrtPriceX96),
                tick: slot0.tick.as_i32(),
                balance0: U256::ZERO,
                balance1: U256::ZERO,
            });
        }
    }
    out
}

fn apply_balances(mut partial: Vec<RawV3>, balance_results: &[CallResult]) -> Vec<RawV3> {
    for (i, raw) in partial.iter_mut().enumerate() {
        let bal0_r = balance_results.get(i * 2);
        let bal1_r = balance_results.get(i * 2 + 1);

        if let Some(r) = bal0_r {
            if r.success {
                if let Ok(bal) = IERC20::balanceOfCall::abi_decode_returns(&r.return_data, true) {
                    raw.balance0 = bal._0;
                }
            }
        }
        if let Some(r) = bal1_r {
            if r.success {
                if let Ok(bal) = IERC20::balanceOfCall::abi_decode_returns(&r.return_data, true) {
                    raw.balance1 = bal._0;
                }
            }
        }
    }
    partial
}
