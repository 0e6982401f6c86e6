use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// A token's resolved identity (§3 `TokenInfo`). Immutable once resolved;
/// the Token Registry hands back [`TokenInfo::unknown`] rather than
/// propagating a decode failure so one bad token never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(address: Address, symbol: impl Into<String>, name: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            name: name.into(),
            decimals,
        }
    }

    /// Default for a token whose name/symbol/decimals failed to decode.
    pub fn unknown(address: Address) -> Self {
        Self {
            address,
            symbol: "UNKNOWN".to_string(),
            name: "Unknown".to_string(),
            decimals: 18,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.symbol == "UNKNOWN"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::address_from_u64;

    #[test]
    fn unknown_token_defaults_to_18_decimals() {
        let t = TokenInfo::unknown(address_from_u64(1));
        assert_eq!(t.decimals, 18);
        assert!(t.is_unknown());
    }
}
