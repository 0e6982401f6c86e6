use crate::model::token::TokenInfo;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Which AMM family a pool belongs to (§3 `ProtocolKind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    V2,
    V3,
}

impl ProtocolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::V2 => "v2",
            ProtocolKind::V3 => "v3",
        }
    }
}

/// Raw on-chain pool state, tagged by protocol (§3 `PoolState`, §9 runtime
/// dispatch note). Every downstream consumer branches on this tag; no
/// inheritance is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PoolState {
    V2 {
        reserve0: U256,
        reserve1: U256,
        block_timestamp: u32,
    },
    V3 {
        sqrt_price_x96: U256,
        tick: i32,
        liquidity: u128,
        actual_balance0: U256,
        actual_balance1: U256,
    },
}

impl PoolState {
    /// Invariant 4: `priceRatio > 0` iff the pool has non-zero state of the
    /// appropriate kind.
    pub fn has_nonzero_state(&self) -> bool {
        match self {
            PoolState::V2 { reserve0, reserve1, .. } => !reserve0.is_zero() && !reserve1.is_zero(),
            PoolState::V3 { sqrt_price_x96, liquidity, .. } => !sqrt_price_x96.is_zero() && *liquidity > 0,
        }
    }
}

/// TVL health tier for a pool (§3 `LiquidityInfo.status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiquidityStatus {
    Active,
    WarningLiquidity,
    LowLiquidity,
    Empty,
    Rugged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityInfo {
    pub total_usd: f64,
    pub total_native: f64,
    pub token0_amount: f64,
    pub token1_amount: f64,
    pub status: LiquidityStatus,
    /// Set only when `status == Rugged` — why the pool was flagged.
    pub rug_reason: Option<String>,
}

impl LiquidityInfo {
    /// Thresholds from §4.7: ACTIVE >= $1000, WARNING >= $100, EMPTY when
    /// both raw amounts and USD are zero, else LOW_LIQUIDITY.
    pub fn status_from_usd(total_usd: f64, reserves_are_zero: bool) -> LiquidityStatus {
        if total_usd >= 1000.0 {
            LiquidityStatus::Active
        } else if total_usd >= 100.0 {
            LiquidityStatus::WarningLiquidity
        } else if reserves_are_zero && total_usd <= 0.0 {
            LiquidityStatus::Empty
        } else {
            LiquidityStatus::LowLiquidity
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceInfo {
    pub token0_price: f64,
    pub token1_price: f64,
    pub price_ratio: f64,
    pub in_usd: f64,
    pub in_native: f64,
    pub pair_token_symbol: String,
    pub display_price: f64,
    pub source: String,
}

/// A fully reconstructed pool (§3 `Pool`): identity, raw state, and the
/// derived liquidity/price views the rest of the engine consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub address: Address,
    pub kind: ProtocolKind,
    pub token0: TokenInfo,
    pub token1: TokenInfo,
    pub fee_bps: u32,
    pub state: PoolState,
    pub liquidity: LiquidityInfo,
    pub price: PriceInfo,
    pub last_updated: i64,
}

impl Pool {
    pub fn fee_pct(&self) -> f64 {
        self.fee_bps as f64 / 10_000.0
    }

    /// The non-target side of the pool, given which token the caller cares
    /// about (the "pair token" of the GLOSSARY).
    pub fn other_token(&self, target: Address) -> Option<&TokenInfo> {
        if self.token0.address == target {
            Some(&self.token1)
        } else if self.token1.address == target {
            Some(&self.token0)
        } else {
            None
        }
    }

    pub fn contains_token(&self, token: Address) -> bool {
        self.token0.address == token || self.token1.address == token
    }

    /// Invariant 3: rugged pools never appear in recommendations or routes.
    pub fn is_rugged(&self) -> bool {
        matches!(self.liquidity.status, LiquidityStatus::Rugged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liquidity_status_thresholds() {
        assert_eq!(LiquidityInfo::status_from_usd(5000.0, false), LiquidityStatus::Active);
        assert_eq!(LiquidityInfo::status_from_usd(500.0, false), LiquidityStatus::WarningLiquidity);
        assert_eq!(LiquidityInfo::status_from_usd(0.0, true), LiquidityStatus::Empty);
        assert_eq!(LiquidityInfo::status_from_usd(50.0, false), LiquidityStatus::LowLiquidity);
    }

    #[test]
    fn v2_state_nonzero_requires_both_reserves() {
        let s = PoolState::V2 { reserve0: U256::from(1u64), reserve1: U256::ZERO, block_timestamp: 0 };
        assert!(!s.has_nonzero_state());
        let s = PoolState::V2 { reserve0: U256::from(1u64), reserve1: U256::from(1u64), block_timestamp: 0 };
        assert!(s.has_nonzero_state());
    }

    #[test]
    fn v3_state_nonzero_requires_sqrt_price_and_liquidity() {
        let s = PoolState::V3 {
            sqrt_price_x96: U256::ZERO,
            tick: 0,
            liquidity: 1,
            actual_balance0: U256::ZERO,
            actual_balance1: U256::ZERO,
        };
        assert!(!s.has_nonzero_state());
    }
}
