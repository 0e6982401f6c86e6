//! Token Registry (§4.3): hardcoded table → cache → one batched on-chain
//! read, with per-field decode fallback to `TokenInfo::unknown`. Grounded on
//! the teacher's `utils/types` constant-address table, generalized into a
//! full registry backed by the Batch Caller and the token-store cache.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use alloy_sol_types::SolCall;

use crate::cache::EngineCache;
use crate::config::contracts::BaseTokens;
use crate::model::token::TokenInfo;
use crate::rpc::abi::IERC20;
use crate::rpc::batch::{BatchCaller, PendingCall};
use crate::utils::error::Result;

fn lower_hex(addr: Address) -> String {
    format!("{addr:#x}").to_lowercase()
}

fn hardcoded(addr: Address) -> Option<TokenInfo> {
    BaseTokens::all()
        .into_iter()
        .find(|t| t.parsed_address() == addr)
        .map(|t| TokenInfo::new(t.parsed_address(), t.symbol, t.symbol, t.decimals))
}

/// `GetTokenInfo` / `GetMany` (§4.3) over the three-stage resolution order.
pub struct TokenRegistry {
    batch_caller: Arc<BatchCaller>,
    cache: Arc<EngineCache>,
}

impl TokenRegistry {
    pub fn new(batch_caller: Arc<BatchCaller>, cache: Arc<EngineCache>) -> Self {
        Self { batch_caller, cache }
    }

    pub async fn get_token_info(&self, addr: Address) -> Result<TokenInfo> {
        if let Some(t) = hardcoded(addr) {
            return Ok(t);
        }

        let key = lower_hex(addr);
        let cache = &self.cache;
        let fetched = cache
            .tokens
            .get_or_fill(&key, || async move { Ok(Some(self.fetch_one(addr).await?)) })
            .await?;
        Ok(fetched.unwrap_or_else(|| TokenInfo::unknown(addr)))
    }

    /// Splits the uncached tail of `addrs` into a single batch (§4.3).
    pub async fn get_many(&self, addrs: &[Address]) -> Result<HashMap<Address, TokenInfo>> {
        let mut resolved = HashMap::with_capacity(addrs.len());
        let mut uncached = Vec::new();

        for &addr in addrs {
            if let Some(t) = hardcoded(addr) {
                resolved.insert(addr, t);
                continue;
            }
            match self.cache.tokens.get(&lower_hex(addr)) {
                Some(t) => {
                    resolved.insert(addr, t);
                }
                None => uncached.push(addr),
            }
        }

        if !uncached.is_empty() {
            let fetched = self.fetch_many(&uncached).await?;
            for (addr, info) in fetched {
                self.cache.tokens.set(&lower_hex(addr), info.clone());
                resolved.insert(addr, info);
            }
        }

        Ok(resolved)
    }

    async fn fetch_one(&self, addr: Address) -> Result<TokenInfo> {
        let mut fetched = self.fetch_many(&[addr]).await?;
        Ok(fetched.remove(&addr).unwrap_or_else(|| TokenInfo::unknown(addr)))
    }

    async fn fetch_many(&self, addrs: &[Address]) -> Result<HashMap<Address, TokenInfo>> {
        if addrs.is_empty() {
            return Ok(HashMap::new());
        }

        let mut calls = Vec::with_capacity(addrs.len() * 3);
        for &addr in addrs {
            calls.push(PendingCall::new(addr, IERC20::nameCall {}.abi_encode()));
            calls.push(PendingCall::new(addr, IERC20::symbolCall {}.abi_encode()));
            calls.push(PendingCall::new(addr, IERC20::decimalsCall {}.abi_encode()));
        }

        let results = self.batch_caller.batch(calls).await?;

        let mut out = HashMap::with_capacity(addrs.len());
        for (i, &addr) in addrs.iter().enumerate() {
            let name_r = &results[i * 3];
            let symbol_r = &results[i * 3 + 1];
            let decimals_r = &results[i * 3 + 2];

            let name = name_r
                .success
                .then(|| IERC20::nameCall::abi_decode_returns(&name_r.return_data, true).ok())
                .flatten()
                .map(|r| r._0);
            let symbol = symbol_r
                .success
                .then(|| IERC20::symbolCall::abi_decode_returns(&symbol_r.return_data, true).ok())
                .flatten()
                .map(|r| r._0);
            let decimals = decimals_r
                .success
                .then(|| IERC20::decimalsCall::abi_decode_returns(&decimals_r.return_data, true).ok())
                .flatten()
                .map(|r| r._0);

            let info = match (name, symbol, decimals) {
                (Some(name), Some(symbol), Some(decimals)) => TokenInfo::new(addr, symbol, name, decimals),
                _ => TokenInfo::unknown(addr),
            };
            out.insert(addr, info);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::address_from_u64;

    #[test]
    fn hardcoded_lookup_returns_wrapper_for_weth() {
        let wrapper = BaseTokens::wrapper();
        let info = hardcoded(wrapper.parsed_address()).unwrap();
        assert_eq!(info.symbol, "WETH");
        assert_eq!(info.decimals, 18);
    }

    #[test]
    fn hardcoded_lookup_misses_for_unrelated_address() {
        assert!(hardcoded(address_from_u64(999)).is_none());
    }
}
