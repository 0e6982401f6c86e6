/// Fixed-point Q96 constant for V3 sqrt-price calculations.
pub const Q96: u128 = 1u128 << 96;

/// Closed set of V3 fee tiers, in basis points.
pub const V3_FEE_TIERS_BPS: [u32; 5] = [100, 500, 2500, 3000, 10000];

/// Default V2 fee when a pair doesn't expose one explicitly.
pub const DEFAULT_V2_FEE_BPS: u32 = 2500;

/// V3 tick bounds; a pool parked within `RUG_TICK_MARGIN` of either bound is
/// treated as abandoned.
pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;
pub const RUG_TICK_MARGIN: i32 = 100;

/// Default trade size used when a caller doesn't specify one.
pub const DEFAULT_TRADE_USD: f64 = 1000.0;

/// Trade-size tier boundaries (USD).
pub const TRADE_SIZE_MICRO_MAX: f64 = 100.0;
pub const TRADE_SIZE_SMALL_MAX: f64 = 1_000.0;
pub const TRADE_SIZE_MEDIUM_MAX: f64 = 10_000.0;
pub const TRADE_SIZE_LARGE_MAX: f64 = 100_000.0;

/// Maximum hops the router will search.
pub const MAX_HOPS: usize = 3;

/// Helper to create an Address from a u64 value (for tests).
/// Places the value in the last 8 bytes (big-endian), matching
/// the old `Address::from_low_u64_be` behaviour from ethers-rs.
pub fn address_from_u64(n: u64) -> alloy_primitives::Address {
    let mut bytes = [0u8; 20];
    bytes[12..20].copy_from_slice(&n.to_be_bytes());
    alloy_primitives::Address::from(bytes)
}

/// Helper functions for U256 <-> f64 conversion used by the pricing layer.
pub mod u256_ext {
    use alloy_primitives::U256;

    pub fn to_f64(value: U256) -> f64 {
        let mut result = 0.0;
        let mut multiplier = 1.0;

        for word in value.as_limbs().iter() {
            result += (*word as f64) * multiplier;
            multiplier *= 2.0_f64.powi(64);
        }

        result
    }

    pub fn from_f64(value: f64) -> U256 {
        if value <= 0.0 {
            return U256::ZERO;
        }
        U256::from(value as u128)
    }
}
