//! Discovery (§4.6): for a target token, iterate (protocol, base-token) and,
//! for V3, the fee-tier set, building one batched `getPair`/`getPool` call
//! and decoding non-zero addresses into candidates. Grounded on the
//! teacher's `sync/pool_sync.rs` pool-population loop, generalized from a
//! static mock seed to a live factory scan over the curated base-token set.

use std::collections::HashSet;
use std::sync::Arc;

use alloy_primitives::{Address, Uint};
use alloy_sol_types::SolCall;

use crate::config::contracts::{BaseTokens, ContractAddresses};
use crate::model::pool::ProtocolKind;
use crate::rpc::abi::{IUniswapV2Factory, IUniswapV3Factory};
use crate::rpc::batch::{BatchCaller, PendingCall};
use crate::utils::error::Result;
use crate::utils::types::V3_FEE_TIERS_BPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Restricts the base set to the three highest-liquidity bases.
    Fast,
    /// Uses all five discovery bases.
    Full,
}

#[derive(Debug, Clone)]
pub struct PoolCandidate {
    pub address: Address,
    pub kind: ProtocolKind,
    pub other_token: Address,
    pub fee_bps: Option<u32>,
}

enum CallMeta {
    V2 { other: Address },
    V3 { other: Address, fee_bps: u32 },
}

pub struct Discovery {
    batch_caller: Arc<BatchCaller>,
    contracts: ContractAddresses,
}

impl Discovery {
    pub fn new(batch_caller: Arc<BatchCaller>, contracts: ContractAddresses) -> Self {
        Self { batch_caller, contracts }
    }

    pub async fn discover(&self, target: Address, mode: DiscoveryMode) -> Result<Vec<PoolCandidate>> {
        let bases: Vec<Address> = match mode {
            DiscoveryMode::Fast => BaseTokens::fast_set().iter().map(|t| t.parsed_address()).collect(),
            DiscoveryMode::Full => BaseTokens::discovery_set().iter().map(|t| t.parsed_address()).collect(),
        };
        let bases: Vec<Address> = bases.into_iter().filter(|&b| b != target).collect();
        if bases.is_empty() {
            return Ok(Vec::new());
        }

        let v2_factory: Address = self.contracts.v2_factory.parse().unwrap_or(Address::ZERO);
        let v3_factory: Address = self.contracts.v3_factory.parse().unwrap_or(Address::ZERO);

        let mut calls = Vec::with_capacity(bases.len() * (1 + V3_FEE_TIERS_BPS.len()));
        let mut meta = Vec::with_capacity(calls.capacity());

        for &base in &bases {
            let call_data = IUniswapV2Factory::getPairCall { tokenA: target, tokenB: base }.abi_encode();
            calls.push(PendingCall::new(v2_factory, call_data));
            meta.push(CallMeta::V2 { other: base });
        }

        for &base in &bases {
            for &fee_bps in V3_FEE_TIERS_BPS.iter() {
                let fee: Uint<24, 1> = Uint::from(fee_bps);
                let call_data = IUniswapV3Factory::getPoolCall { tokenA: target, tokenB: base, fee }.abi_encode();
                calls.push(PendingCall::new(v3_factory, call_data));
                meta.push(CallMeta::V3 { other: base, fee_bps });
            }
        }

        let results = self.batch_caller.batch(calls).await?;

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for (result, m) in results.iter().zip(meta.iter()) {
            if !result.success {
                continue;
            }
            match m {
                CallMeta::V2 { other } => {
                    if let Ok(ret) = IUniswapV2Factory::getPairCall::abi_decode_returns(&result.return_data, true) {
                        push_candidate(&mut seen, &mut candidates, ret.pair, ProtocolKind::V2, *other, None);
                    }
                }
                CallMeta::V3 { other, fee_bps } => {
                    if let Ok(ret) = IUniswapV3Factory::getPoolCall::abi_decode_returns(&result.return_data, true) {
                        push_candidate(&mut seen, &mut candidates, ret.pool, ProtocolKind::V3, *other, Some(*fee_bps));
                    }
                }
            }
        }

        Ok(candidates)
    }
}

fn push_candidate(
    seen: &mut HashSet<(ProtocolKind, String)>,
    candidates: &mut Vec<PoolCandidate>,
    addr: Address,
    kind: ProtocolKind,
    other_token: Address,
    fee_bps: Option<u32>,
) {
    if addr.is_zero() {
        return;
    }
    let key = (kind, format!("{addr:#x}").to_lowercase());
    if seen.insert(key) {
        candidates.push(PoolCandidate { address: addr, kind, other_token, fee_bps });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::address_from_u64;

    #[test]
    fn push_candidate_skips_zero_address() {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        push_candidate(&mut seen, &mut candidates, Address::ZERO, ProtocolKind::V2, address_from_u64(1), None);
        assert!(candidates.is_empty());
    }

    #[test]
    fn push_candidate_dedupes_on_kind_and_address() {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let addr = address_from_u64(42);
        push_candidate(&mut seen, &mut candidates, addr, ProtocolKind::V3, address_from_u64(1), Some(500));
        push_candidate(&mut seen, &mut candidates, addr, ProtocolKind::V3, address_from_u64(2), Some(3000));
        assert_eq!(candidates.len(), 1);
    }
}
