use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Chain-level contract addresses: the Batch Caller's aggregation contract
/// and each protocol's factory (Discovery builds `getPair`/`getPool`
/// sub-calls against these).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// Multicall3-style aggregation contract used by the Batch Caller.
    pub multicall3: &'static str,
    /// V2 constant-product pair factory.
    pub v2_factory: &'static str,
    /// V3 concentrated-liquidity pool factory.
    pub v3_factory: &'static str,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self::base_mainnet()
    }
}

impl ContractAddresses {
    pub fn base_mainnet() -> Self {
        Self {
            multicall3: "0xcA11bde05977b3631167028862bE2a173976CA11",
            v2_factory: "0x8909Dc15e40173Ff4699343b6eB8132c65e18eC6",
            v3_factory: "0x33128a8fC17869897dcE68Ed026d694621f6FDfD",
        }
    }

    pub fn for_chain(chain_id: u64) -> Option<Self> {
        match chain_id {
            8453 => Some(Self::base_mainnet()),
            _ => None,
        }
    }

    /// Validate that all addresses are non-zero and well-formed.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("multicall3", self.multicall3),
            ("v2_factory", self.v2_factory),
            ("v3_factory", self.v3_factory),
        ] {
            let parsed = Address::from_str(value).map_err(|_| format!("{name} is not a valid address"))?;
            if parsed.is_zero() {
                return Err(format!("{name} address not set"));
            }
        }
        Ok(())
    }
}

/// A base token's role in discovery/pricing/routing. See the base-token
/// sizing resolution for why the registry table, discovery set, and routing
/// intermediate sets are different-sized views over the same six tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseTokenRole {
    Wrapper,
    Stable1,
    Stable2,
    Stable3,
    Stable4,
    Ecosystem,
}

#[derive(Debug, Clone, Copy)]
pub struct BaseToken {
    pub role: BaseTokenRole,
    pub address: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

impl BaseToken {
    pub fn parsed_address(&self) -> Address {
        Address::from_str(self.address).unwrap_or(Address::ZERO)
    }
}

/// The curated base-token table for Base mainnet: native wrapper, four
/// stablecoins, and the ecosystem token.
pub struct BaseTokens;

const WRAPPER: BaseToken = BaseToken {
    role: BaseTokenRole::Wrapper,
    address: "0x4200000000000000000000000000000000000006", // WETH on Base
    symbol: "WETH",
    decimals: 18,
};
const STABLE1: BaseToken = BaseToken {
    role: BaseTokenRole::Stable1,
    address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", // USDC
    symbol: "USDC",
    decimals: 6,
};
const STABLE2: BaseToken = BaseToken {
    role: BaseTokenRole::Stable2,
    address: "0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb", // DAI
    symbol: "DAI",
    decimals: 18,
};
const STABLE3: BaseToken = BaseToken {
    role: BaseTokenRole::Stable3,
    address: "0xd9aAEc86B65D86f6A7B5B1b0c42FFA531710b6CA", // USDbC
    symbol: "USDbC",
    decimals: 6,
};
const STABLE4: BaseToken = BaseToken {
    role: BaseTokenRole::Stable4,
    address: "0xfde4C96c8593536E31F229EA8f37b2ADa2699bb2", // USDT (bridged)
    symbol: "USDT",
    decimals: 6,
};
const ECOSYSTEM: BaseToken = BaseToken {
    role: BaseTokenRole::Ecosystem,
    address: "0x532f27101965dd16442E59d40670FaF5eBB142E4", // BRETT (Base ecosystem token)
    symbol: "BRETT",
    decimals: 18,
};

impl BaseTokens {
    /// All six roles in the Token Registry's hardcoded metadata table.
    pub fn all() -> [BaseToken; 6] {
        [WRAPPER, STABLE1, STABLE2, STABLE3, STABLE4, ECOSYSTEM]
    }

    /// Discovery's "full mode" base set: five of the six roles. `Stable4` is
    /// known token metadata but is not iterated as a discovery base — see
    /// the base-token sizing resolution.
    pub fn discovery_set() -> [BaseToken; 5] {
        [WRAPPER, STABLE1, STABLE2, STABLE3, ECOSYSTEM]
    }

    /// Discovery's "fast mode" base set: the three highest-liquidity bases.
    pub fn fast_set() -> [BaseToken; 3] {
        [WRAPPER, STABLE1, STABLE2]
    }

    /// Router's PRIMARY intermediate set.
    pub fn primary() -> [BaseToken; 3] {
        [WRAPPER, STABLE1, STABLE2]
    }

    /// Router's SECONDARY intermediate set.
    pub fn secondary() -> [BaseToken; 1] {
        [ECOSYSTEM]
    }

    pub fn wrapper() -> BaseToken {
        WRAPPER
    }

    pub fn ecosystem() -> BaseToken {
        ECOSYSTEM
    }

    /// Minimum pair-side reserve, by symbol, used by the Pool Scorer's
    /// rug-pull check. `other` covers every symbol not named explicitly.
    pub fn min_pair_reserve(symbol: &str) -> f64 {
        match symbol {
            s if s == WRAPPER.symbol => 0.001,
            s if s == STABLE1.symbol || s == STABLE2.symbol || s == STABLE3.symbol || s == STABLE4.symbol => 10.0,
            s if s == ECOSYSTEM.symbol => 5.0,
            _ => 10.0,
        }
    }
}

/// Named pools the Price Oracle reads directly to refresh the wrapper and
/// ecosystem USD prices.
pub struct OraclePools;

impl OraclePools {
    /// V3 pool pairing the wrapper token against `STABLE1`. `token0_is_stable`
    /// tells the oracle whether to invert the sqrt-price ratio.
    pub fn wrapper_stable_pool() -> (&'static str, bool) {
        ("0xd0b53D9277642d899DF5C87A3966A349A798F224", true)
    }

    /// V3 pool pairing the ecosystem token against the wrapper token.
    pub fn ecosystem_wrapper_pool() -> (&'static str, bool) {
        ("0x76Bf0abD20f1e0ADBa79BdD07a9A2a5255F63dE1", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_mainnet_addresses() {
        let contracts = ContractAddresses::base_mainnet();
        assert_eq!(contracts.multicall3, "0xcA11bde05977b3631167028862bE2a173976CA11");
    }

    #[test]
    fn test_for_chain() {
        assert!(ContractAddresses::for_chain(8453).is_some());
        assert!(ContractAddresses::for_chain(1).is_none());
    }

    #[test]
    fn test_validate() {
        assert!(ContractAddresses::base_mainnet().validate().is_ok());
    }

    #[test]
    fn test_discovery_set_excludes_stable4() {
        let set = BaseTokens::discovery_set();
        assert!(!set.iter().any(|t| t.role == BaseTokenRole::Stable4));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_primary_and_secondary_are_disjoint() {
        let primary = BaseTokens::primary();
        let secondary = BaseTokens::secondary();
        assert!(primary.iter().all(|p| !secondary.iter().any(|s| s.role == p.role)));
    }

    #[test]
    fn test_min_pair_reserve_by_symbol() {
        assert_eq!(BaseTokens::min_pair_reserve("WETH"), 0.001);
        assert_eq!(BaseTokens::min_pair_reserve("USDC"), 10.0);
        assert_eq!(BaseTokens::min_pair_reserve("BRETT"), 5.0);
        assert_eq!(BaseTokens::min_pair_reserve("SOME_RANDOM_TOKEN"), 10.0);
    }
}
