//! Price Oracle (§4.4): a small mutable `addr -> priceUSD` map seeded with
//! native wrapper/stablecoins/ecosystem token, refreshed from two named
//! on-chain pools. No teacher equivalent (the teacher assigns mock USD
//! prices at pool-synthesis time); grounded on the Batch Caller + the
//! `calc_sqrt_price_to_price` formula this module shares with
//! `utils::math`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use parking_lot::RwLock;

use crate::config::contracts::{BaseTokens, OraclePools};
use crate::config::settings::BaseTokenSettings;
use crate::rpc::abi::IUniswapV3Pool;
use crate::rpc::batch::{BatchCaller, PendingCall};
use crate::utils::error::Result;
use crate::utils::math::calc_sqrt_price_to_price;

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// `priceUSD` map plus on-chain refresh (§4.4).
pub struct PriceOracle {
    prices: RwLock<HashMap<Address, f64>>,
    last_update_ms: AtomicI64,
    refreshing: AtomicBool,
    batch_caller: Arc<BatchCaller>,
    settings: BaseTokenSettings,
}

impl PriceOracle {
    pub fn new(batch_caller: Arc<BatchCaller>, settings: BaseTokenSettings) -> Self {
        let mut prices = HashMap::new();
        prices.insert(BaseTokens::wrapper().parsed_address(), 3000.0);
        for stable in [
            BaseTokens::all()[1].parsed_address(),
            BaseTokens::all()[2].parsed_address(),
            BaseTokens::all()[3].parsed_address(),
            BaseTokens::all()[4].parsed_address(),
        ] {
            prices.insert(stable, 1.0);
        }
        prices.insert(BaseTokens::ecosystem().parsed_address(), 0.1);

        Self {
            prices: RwLock::new(prices),
            last_update_ms: AtomicI64::new(0),
            refreshing: AtomicBool::new(false),
            batch_caller,
            settings,
        }
    }

    pub fn get_price_usd(&self, addr: Address) -> Option<f64> {
        self.prices.read().get(&addr).copied()
    }

    pub fn get_native_price_usd(&self) -> f64 {
        self.get_price_usd(BaseTokens::wrapper().parsed_address()).unwrap_or(0.0)
    }

    /// Snapshot of every token currently priced, for `GET prices` (§6).
    pub fn all_prices(&self) -> HashMap<Address, f64> {
        self.prices.read().clone()
    }

    /// `POST prices {token, price}` (§6): an operator-supplied override,
    /// bypassing the on-chain refresh for that token.
    pub fn set_price_usd(&self, addr: Address, price: f64) {
        self.prices.write().insert(addr, price);
    }

    pub fn are_stale(&self) -> bool {
        let last = self.last_update_ms.load(Ordering::Relaxed);
        if last == 0 {
            return true;
        }
        now_millis() - last > (self.settings.price_stale_secs as i64) * 1000
    }

    /// Re-entrant: a caller that arrives while a refresh is already in
    /// flight gets the current cached state back immediately rather than
    /// waiting on it.
    pub async fn refresh_from_chain(&self) -> Result<()> {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let outcome = self.do_refresh().await;
        self.refreshing.store(false, Ordering::Release);
        outcome
    }

    async fn do_refresh(&self) -> Result<()> {
        let (wrapper_stable_addr, stable_is_token0) = OraclePools::wrapper_stable_pool();
        let (eco_wrapper_addr, wrapper_is_token0) = OraclePools::ecosystem_wrapper_pool();
        let wrapper_stable_addr: Address = wrapper_stable_addr.parse().unwrap_or(Address::ZERO);
        let eco_wrapper_addr: Address = eco_wrapper_addr.parse().unwrap_or(Address::ZERO);

        let calls = vec![
            PendingCall::new(wrapper_stable_addr, IUniswapV3Pool::slot0Call {}.abi_encode()),
            PendingCall::new(eco_wrapper_addr, IUniswapV3Pool::slot0Call {}.abi_encode()),
        ];
        let results = self.batch_caller.batch(calls).await?;

        let wrapper_decimals = BaseTokens::wrapper().decimals as i32;
        let stable_decimals = BaseTokens::all()[1].decimals as i32;
        let ecosystem_decimals = BaseTokens::ecosystem().decimals as i32;

        let mut next_wrapper_price = None;
        if results[0].success {
            if let Ok(slot0) = IUniswapV3Pool::slot0Call::abi_decode_returns(&results[0].return_data, true) {
                let (dec0, dec1) = if stable_is_token0 {
                    (stable_decimals, wrapper_decimals)
                } else {
                    (wrapper_decimals, stable_decimals)
                };
                let ratio = calc_sqrt_price_to_price(U256::from(slot0.sqrtPriceX96), dec0, dec1);
                if ratio > 0.0 {
                    let wrapper_price = derive_usd_price(ratio, stable_is_token0, 1.0);
                    if wrapper_price > self.settings.wrapper_price_floor_usd
                        && wrapper_price < self.settings.wrapper_price_ceiling_usd
                    {
                        next_wrapper_price = Some(wrapper_price);
                    }
                }
            }
        }

        let wrapper_price_for_derivation = next_wrapper_price.unwrap_or_else(|| self.get_native_price_usd());

        let mut next_ecosystem_price = None;
        if results[1].success {
            if let Ok(slot0) = IUniswapV3Pool::slot0Call::abi_decode_returns(&results[1].return_data, true) {
                let (dec0, dec1) = if wrapper_is_token0 {
                    (wrapper_decimals, ecosystem_decimals)
                } else {
                    (ecosystem_decimals, wrapper_decimals)
                };
                let ratio = calc_sqrt_price_to_price(U256::from(slot0.sqrtPriceX96), dec0, dec1);
                if ratio > 0.0 {
                    let ecosystem_price = derive_usd_price(ratio, wrapper_is_token0, wrapper_price_for_derivation);
                    if ecosystem_price > self.settings.ecosystem_price_floor_usd
                        && ecosystem_price < self.settings.ecosystem_price_ceiling_usd
                    {
                        next_ecosystem_price = Some(ecosystem_price);
                    }
                }
            }
        }

        if next_wrapper_price.is_none() && next_ecosystem_price.is_none() {
            return Ok(());
        }

        {
            let mut prices = self.prices.write();
            if let Some(p) = next_wrapper_price {
                prices.insert(BaseTokens::wrapper().parsed_address(), p);
            }
            if let Some(p) = next_ecosystem_price {
                prices.insert(BaseTokens::ecosystem().parsed_address(), p);
            }
        }
        self.last_update_ms.store(now_millis(), Ordering::Relaxed);
        Ok(())
    }

    /// `CalcPoolValueUSD`: sums both sides when both prices are known;
    /// derives the unknown side from the known side via `pool_price_ratio`
    /// (token0-in-token1) when only one price is known; returns 0 when
    /// neither is known.
    pub fn calc_pool_value_usd(
        &self,
        token0: Address,
        token1: Address,
        amt0: f64,
        amt1: f64,
        pool_price_ratio: f64,
    ) -> f64 {
        let (p0, p1) = self.infer_side_prices(token0, token1, pool_price_ratio);
        amt0 * p0 + amt1 * p1
    }

    /// USD price of each side of a pool: both directly if both are in the
    /// map; otherwise the known side derives the other via
    /// `pool_price_ratio` (token0-in-token1, so `usd(token0) = ratio ×
    /// usd(token1)`); `(0.0, 0.0)` if neither side is known.
    pub fn infer_side_prices(&self, token0: Address, token1: Address, pool_price_ratio: f64) -> (f64, f64) {
        let p0 = self.get_price_usd(token0);
        let p1 = self.get_price_usd(token1);

        match (p0, p1) {
            (Some(p0), Some(p1)) => (p0, p1),
            (Some(p0), None) => {
                if pool_price_ratio > 0.0 {
                    (p0, p0 / pool_price_ratio)
                } else {
                    (p0, 0.0)
                }
            }
            (None, Some(p1)) => {
                if pool_price_ratio > 0.0 {
                    (p1 * pool_price_ratio, p1)
                } else {
                    (0.0, p1)
                }
            }
            (None, None) => (0.0, 0.0),
        }
    }
}

/// `known_price` is the USD price of whichever side is already resolved;
/// `token0_is_known` says which side that is. `ratio` is price of token0 in
/// token1 terms from `calc_sqrt_price_to_price`/`calc_v2_price`.
fn derive_usd_price(ratio: f64, token0_is_known: bool, known_price: f64) -> f64 {
    if token0_is_known {
        known_price / ratio
    } else {
        ratio * known_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_price_inverts_when_token0_is_the_known_side() {
        // token0 (known, $1) trades for 0.0003 token1 -> token1 worth ~$3333.
        let p = derive_usd_price(0.0003, true, 1.0);
        assert!((p - 3333.333).abs() < 1.0);
    }

    #[test]
    fn infer_side_prices_matches_derive_usd_price_both_directions() {
        let oracle = PriceOracle::new(
            Arc::new(BatchCaller::new(
                Arc::new(crate::rpc::gateway::RpcGateway::new(crate::config::settings::RpcSettings {
                    endpoints: vec!["http://localhost:8545".to_string()],
                    call_timeout_ms: 1000,
                    max_retry_passes: 1,
                    backoff_base_ms: 10,
                    failure_threshold: 2,
                    failure_window_secs: 60,
                }).unwrap()),
                Address::ZERO,
            )),
            BaseTokenSettings {
                price_stale_secs: 30,
                wrapper_price_floor_usd: 100.0,
                wrapper_price_ceiling_usd: 2000.0,
                ecosystem_price_floor_usd: 0.1,
                ecosystem_price_ceiling_usd: 100.0,
            },
        );

        let token0 = BaseTokens::wrapper().parsed_address();
        let token1 = Address::repeat_byte(7);

        let (p0, p1) = oracle.infer_side_prices(token0, token1, 3000.0);
        assert_eq!(p0, oracle.get_native_price_usd());
        assert!((p1 - p0 / 3000.0).abs() < 1e-9);
    }

    #[test]
    fn derive_price_multiplies_when_token1_is_the_known_side() {
        // token0 trades for 3000 units of token1 ($1 each) -> token0 worth $3000.
        let p = derive_usd_price(3000.0, false, 1.0);
        assert!((p - 3000.0).abs() < 1e-9);
    }
}
