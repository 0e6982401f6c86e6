use alloy_primitives::U256;

/// Q96 constant: 2^96 used for sqrt price fixed-point representation
pub fn q96() -> U256 {
    U256::from(1u128) << 96
}

/// Calculate sqrt using Newton's method for U256
pub fn sqrt_u256(value: U256) -> U256 {
    if value.is_zero() {
        return U256::ZERO;
    }

    let mut z = value;
    let two = U256::from(2);
    let mut x = value / two + U256::from(1);

    while x < z {
        z = x;
        x = (value / x + x) / two;
    }

    z
}

/// Calculate percentage
pub fn calculate_percentage(part: U256, total: U256) -> f64 {
    if total.is_zero() {
        return 0.0;
    }

    let part_f64 = part.to::<u128>() as f64;
    let total_f64 = total.to::<u128>() as f64;

    (part_f64 / total_f64) * 100.0
}

/// Apply slippage to amount
pub fn apply_slippage(amount: U256, slippage_bps: u32) -> U256 {
    let slippage = U256::from(slippage_bps);
    let basis_points = U256::from(10000);

    amount * (basis_points - slippage) / basis_points
}

// ---------------------------------------------------------------------------
// Reserve-ratio and sqrt-price pricing (§4.8)
// ---------------------------------------------------------------------------

/// A widened unsigned integer, just big enough to hold the square of a
/// 256-bit `sqrtPriceX96` without truncation. `alloy_primitives` re-exports
/// the `ruint` crate it's built on, so this costs no extra dependency.
type U512 = alloy_primitives::ruint::Uint<512, 8>;

fn u256_to_u512(value: U256) -> U512 {
    U512::from_limbs_slice(value.as_limbs())
}

fn u512_pow10(exp: u32) -> U512 {
    U512::from(10u64).pow(U512::from(exp))
}

/// V2 reserve-ratio price of token0 in token1, 18-decimal scaled, per the
/// decimal-normalized formula. Returns `(token0Price, token1Price)` as
/// floats; zero reserves yield `(0.0, 0.0)`. All intermediate products stay
/// in 256-bit integers, matching the 256-bit arithmetic requirement.
pub fn calc_v2_price(reserve0: U256, reserve1: U256, dec0: i32, dec1: i32) -> (f64, f64) {
    if reserve0.is_zero() || reserve1.is_zero() {
        return (0.0, 0.0);
    }

    let scale = U256::from(10u64).pow(U256::from(18u64));
    let diff = dec0 - dec1;

    let p01 = if diff >= 0 {
        let factor = U256::from(10u64).pow(U256::from(diff as u64));
        reserve1 * scale * factor / reserve0
    } else {
        let factor = U256::from(10u64).pow(U256::from((-diff) as u64));
        reserve1 * scale / (reserve0 * factor)
    };

    let token0_price = super::types::u256_ext::to_f64(p01) / 1e18;
    if token0_price <= 0.0 {
        return (0.0, 0.0);
    }
    let token1_price = 1.0 / token0_price;
    (token0_price, token1_price)
}

/// Price of token0 in token1 from a V3 `sqrtPriceX96`:
/// `(sqrtPriceX96² × 10^18 × 10^max(0, dec0−dec1)) / (Q96² × 10^max(0, dec1−dec0))`,
/// dividing by `10^18` in floating point only at the end. Returns 0 for zero
/// input. The square of `sqrtPriceX96` is computed in a widened 512-bit
/// integer so it never overflows even at Uniswap's extreme tick bounds,
/// where `sqrtPriceX96` approaches 2^160.
pub fn calc_sqrt_price_to_price(sqrt_price_x96: U256, dec0: i32, dec1: i32) -> f64 {
    if sqrt_price_x96.is_zero() {
        return 0.0;
    }

    let price_sq = u256_to_u512(sqrt_price_x96) * u256_to_u512(sqrt_price_x96);
    let q96_sq = u256_to_u512(q96()) * u256_to_u512(q96());

    let scale = u512_pow10(18);
    let num_extra = u512_pow10(dec0.saturating_sub(dec1).max(0) as u32);
    let den_extra = u512_pow10(dec1.saturating_sub(dec0).max(0) as u32);

    let numerator = price_sq * scale * num_extra;
    let denominator = q96_sq * den_extra;
    if denominator.is_zero() {
        return 0.0;
    }

    let ratio = numerator / denominator;
    u512_to_f64(ratio) / 1e18
}

fn u512_to_f64(value: U512) -> f64 {
    let mut result = 0.0;
    let mut multiplier = 1.0;
    for word in value.as_limbs().iter() {
        result += (*word as f64) * multiplier;
        multiplier *= 2.0_f64.powi(64);
    }
    result
}

/// Per-pool price/liquidity sample fed into `aggregate_prices`.
#[derive(Debug, Clone, Copy)]
pub struct PriceSample {
    pub price_usd: f64,
    pub price_native: f64,
    pub liquidity_usd: f64,
    pub liquidity_native: f64,
}

/// Result of `CalcAggregatePrice`: liquidity-weighted averages with outlier
/// pools excluded from the weighted sum, plus the observed min/max.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatedPrice {
    pub avg_price_usd: f64,
    pub avg_price_native: f64,
    pub min_price_usd: f64,
    pub max_price_usd: f64,
}

/// Two-pass outlier-filtered liquidity-weighted price aggregation. Pass 1
/// computes min/max and the median; pass 2 sums `price × liquidity` only for
/// samples within `[median × 0.1, median × 10]`. Pools outside that band
/// still contribute to min/max but not to the weighted average.
pub fn aggregate_prices(samples: &[PriceSample]) -> AggregatedPrice {
    if samples.is_empty() {
        return AggregatedPrice::default();
    }

    let min_price_usd = samples
        .iter()
        .map(|s| s.price_usd)
        .fold(f64::INFINITY, f64::min);
    let max_price_usd = samples
        .iter()
        .map(|s| s.price_usd)
        .fold(f64::NEG_INFINITY, f64::max);

    let median_usd = median(&mut samples.iter().map(|s| s.price_usd).collect::<Vec<_>>());
    let median_native = median(
        &mut samples
            .iter()
            .map(|s| s.price_native)
            .collect::<Vec<_>>(),
    );

    let lower_usd = median_usd * 0.1;
    let upper_usd = median_usd * 10.0;
    let lower_native = median_native * 0.1;
    let upper_native = median_native * 10.0;

    let mut weighted_usd = 0.0;
    let mut weight_usd = 0.0;
    let mut weighted_native = 0.0;
    let mut weight_native = 0.0;

    for s in samples {
        if s.price_usd >= lower_usd && s.price_usd <= upper_usd {
            weighted_usd += s.price_usd * s.liquidity_usd;
            weight_usd += s.liquidity_usd;
        }
        if s.price_native >= lower_native && s.price_native <= upper_native {
            weighted_native += s.price_native * s.liquidity_native;
            weight_native += s.liquidity_native;
        }
    }

    AggregatedPrice {
        avg_price_usd: if weight_usd > 0.0 {
            weighted_usd / weight_usd
        } else {
            median_usd
        },
        avg_price_native: if weight_native > 0.0 {
            weighted_native / weight_native
        } else {
            median_native
        },
        min_price_usd,
        max_price_usd,
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

// ---------------------------------------------------------------------------
// Tick <-> sqrtPriceX96 conversion
// ---------------------------------------------------------------------------

/// Convert a tick to a sqrtPriceX96 using the standard formula:
/// sqrtPrice = sqrt(1.0001^tick) * 2^96
/// For performance we compute via floating-point and convert.
pub fn tick_to_sqrt_price_x96(tick: i32) -> U256 {
    let sqrt_ratio = (1.0001_f64).powf(tick as f64 / 2.0);
    let q96_f64 = 2.0_f64.powi(96);
    let value = sqrt_ratio * q96_f64;
    if value <= 0.0 || !value.is_finite() {
        return U256::from(1u128) << 96; // 1.0 price
    }
    U256::from(value as u128)
}

/// Convert a sqrtPriceX96 to the nearest tick.
pub fn sqrt_price_x96_to_tick(sqrt_price_x96: U256) -> i32 {
    let q96_f64 = 2.0_f64.powi(96);
    let sqrt_ratio = sqrt_price_x96.to::<u128>() as f64 / q96_f64;
    if sqrt_ratio <= 0.0 {
        return 0;
    }
    let tick = (sqrt_ratio * sqrt_ratio).ln() / 1.0001_f64.ln();
    tick.floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt() {
        assert_eq!(sqrt_u256(U256::from(0)), U256::from(0));
        assert_eq!(sqrt_u256(U256::from(1)), U256::from(1));
        assert_eq!(sqrt_u256(U256::from(4)), U256::from(2));
        assert_eq!(sqrt_u256(U256::from(9)), U256::from(3));
        assert_eq!(sqrt_u256(U256::from(16)), U256::from(4));
    }

    #[test]
    fn test_slippage() {
        let amount = U256::from(1000);
        // 0.5% slippage (50 bps)
        let result = apply_slippage(amount, 50);
        assert_eq!(result, U256::from(995));
    }

    #[test]
    fn test_v2_price_zero_reserves() {
        let (p0, p1) = calc_v2_price(U256::ZERO, U256::from(1000u64), 18, 18);
        assert_eq!(p0, 0.0);
        assert_eq!(p1, 0.0);
    }

    #[test]
    fn test_v2_price_balanced_same_decimals() {
        // equal reserves, equal decimals -> price of token0 in token1 is 1.0
        let reserve = U256::from(1_000_000u64);
        let (p0, p1) = calc_v2_price(reserve, reserve, 18, 18);
        assert!((p0 - 1.0).abs() < 1e-9);
        assert!((p1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_v2_price_decimal_adjustment() {
        // reserve0 has 6 decimals (like USDC), reserve1 has 18; same raw
        // reserve counts should NOT yield a 1:1 price once decimals differ.
        let reserve0 = U256::from(1_000_000u64); // 1 unit at 6 decimals
        let reserve1 = U256::from(1_000_000_000_000_000_000u128); // 1 unit at 18 decimals
        let (p0, _p1) = calc_v2_price(reserve0, reserve1, 6, 18);
        assert!((p0 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sqrt_price_to_price_zero_input() {
        assert_eq!(calc_sqrt_price_to_price(U256::ZERO, 18, 18), 0.0);
    }

    #[test]
    fn test_sqrt_price_to_price_at_tick_zero() {
        // sqrtPriceX96 at tick 0 encodes a 1:1 price (equal decimals).
        let sqrt_price = q96();
        let price = calc_sqrt_price_to_price(sqrt_price, 18, 18);
        assert!((price - 1.0).abs() < 1e-6, "expected ~1.0, got {price}");
    }

    #[test]
    fn test_sqrt_price_to_price_near_max_tick_does_not_overflow() {
        // Near the top of the V3 tick range sqrtPriceX96 approaches 2^160;
        // squaring it must not panic or wrap inside a 256-bit type.
        let sqrt_price = tick_to_sqrt_price_x96(800_000);
        let price = calc_sqrt_price_to_price(sqrt_price, 18, 18);
        assert!(price.is_finite());
        assert!(price > 0.0);
    }

    #[test]
    fn test_aggregate_prices_outlier_filtered() {
        let samples = vec![
            PriceSample { price_usd: 1.00, price_native: 1.00, liquidity_usd: 100.0, liquidity_native: 100.0 },
            PriceSample { price_usd: 1.01, price_native: 1.01, liquidity_usd: 100.0, liquidity_native: 100.0 },
            PriceSample { price_usd: 0.99, price_native: 0.99, liquidity_usd: 100.0, liquidity_native: 100.0 },
            PriceSample { price_usd: 1.02, price_native: 1.02, liquidity_usd: 100.0, liquidity_native: 100.0 },
            PriceSample { price_usd: 50.00, price_native: 50.00, liquidity_usd: 100.0, liquidity_native: 100.0 },
        ];
        let result = aggregate_prices(&samples);
        assert!((result.avg_price_usd - 1.005).abs() < 0.01, "got {}", result.avg_price_usd);
        assert_eq!(result.max_price_usd, 50.00);
        assert_eq!(result.min_price_usd, 0.99);
    }

    #[test]
    fn test_aggregate_prices_empty() {
        let result = aggregate_prices(&[]);
        assert_eq!(result.avg_price_usd, 0.0);
    }

    #[test]
    fn test_tick_to_sqrt_price_roundtrip() {
        for tick in [-10000, -1000, -100, 0, 100, 1000, 10000] {
            let sqrt_price = tick_to_sqrt_price_x96(tick);
            let recovered_tick = sqrt_price_x96_to_tick(sqrt_price);
            assert!(
                (recovered_tick - tick).abs() <= 1,
                "Tick roundtrip failed: {} -> {} -> {}",
                tick,
                sqrt_price,
                recovered_tick
            );
        }
    }
}
