use alloy_primitives::U256;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pool_analytics_engine::model::pool::{LiquidityInfo, LiquidityStatus, Pool, PoolState, PriceInfo, ProtocolKind};
use pool_analytics_engine::model::token::TokenInfo;
use pool_analytics_engine::scoring::select_recommended;
use pool_analytics_engine::utils::address_from_u64;
use pool_analytics_engine::utils::math::{aggregate_prices, PriceSample};

fn make_pool(i: u64, liquidity_usd: f64, price_usd: f64) -> Pool {
    let target = address_from_u64(1);
    let pair = address_from_u64(1000 + i);
    Pool {
        address: address_from_u64(2000 + i),
        kind: if i % 2 == 0 { ProtocolKind::V2 } else { ProtocolKind::V3 },
        token0: TokenInfo::new(target, "TGT", "Target", 18),
        token1: TokenInfo::new(pair, "WETH", "Wrapped Ether", 18),
        fee_bps: 3000,
        state: PoolState::V2 { reserve0: U256::from(1_000_000u64), reserve1: U256::from(1_000_000u64), block_timestamp: 0 },
        liquidity: LiquidityInfo { total_usd: liquidity_usd, total_native: liquidity_usd / 3000.0, token0_amount: 1000.0, token1_amount: 1000.0, status: LiquidityStatus::Active, rug_reason: None },
        price: PriceInfo {
            token0_price: price_usd,
            token1_price: 1.0 / price_usd.max(1e-9),
            price_ratio: price_usd,
            in_usd: price_usd,
            in_native: price_usd / 3000.0,
            pair_token_symbol: "WETH".to_string(),
            display_price: price_usd,
            source: "v2".to_string(),
        },
        last_updated: 0,
    }
}

fn setup_pools(count: usize) -> Vec<Pool> {
    (0..count as u64).map(|i| make_pool(i, 10_000.0 + i as f64 * 500.0, 1.0 + (i as f64 % 5.0) * 0.01)).collect()
}

fn bench_select_recommended(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_recommended");
    for pool_count in [5, 25, 100] {
        let pools = setup_pools(pool_count);
        group.bench_with_input(BenchmarkId::from_parameter(pool_count), &pools, |b, pools| {
            b.iter(|| select_recommended(black_box(pools), black_box(address_from_u64(1)), black_box(1000.0), black_box(1.0)));
        });
    }
    group.finish();
}

fn bench_aggregate_prices(c: &mut Criterion) {
    let samples: Vec<PriceSample> = (0..100).map(|i| PriceSample { price_usd: 1.0 + (i as f64 % 5.0) * 0.01, price_native: 0.00033, liquidity_usd: 10_000.0 + i as f64 * 100.0, liquidity_native: 3.3 }).collect();

    c.bench_function("aggregate_prices_100_samples", |b| {
        b.iter(|| aggregate_prices(black_box(&samples)));
    });
}

criterion_group!(benches, bench_select_recommended, bench_aggregate_prices);
criterion_main!(benches);
