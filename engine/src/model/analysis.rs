use crate::model::pool::{Pool, ProtocolKind};
use crate::model::token::TokenInfo;
use crate::model::warning::Warning;
use crate::scoring::PoolScore;
use crate::utils::math::AggregatedPrice;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recommendation plus the "best pool by X" variants returned alongside it
/// (§3 `AnalysisResult.bestPools`, §4.9 "Default-best variants").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestPools {
    pub by_liquidity: Option<Address>,
    pub by_price_usd: Option<Address>,
    pub by_price_native: Option<Address>,
    pub by_fee: Option<Address>,
    pub by_protocol: HashMap<ProtocolKind, Address>,
    pub recommended: PoolScore,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TotalLiquidity {
    pub usd: f64,
    pub native: f64,
}

/// One group of the aggregation's "per pair-token symbol" breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairGroup {
    pub pair_symbol: String,
    pub pool_count: usize,
    pub avg_price_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAnalysis {
    pub aggregated: AggregatedPrice,
    pub per_pair: Vec<PairGroup>,
    /// `(maxUSD − minUSD) / avgUSD`, used by the spread warning tiers.
    pub spread_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub by_protocol: HashMap<ProtocolKind, usize>,
    pub by_status: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBreakdown {
    pub total_liquidity: TotalLiquidity,
    pub price_analysis: PriceAnalysis,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceGrade {
    APlus,
    A,
    B,
    C,
}

impl PerformanceGrade {
    pub fn from_total_ms(total_ms: u64) -> Self {
        if total_ms < 500 {
            PerformanceGrade::APlus
        } else if total_ms < 1000 {
            PerformanceGrade::A
        } else if total_ms < 2000 {
            PerformanceGrade::B
        } else {
            PerformanceGrade::C
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Performance {
    pub total_ms: u64,
    pub grade: PerformanceGrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolFetchStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolStatusEntry {
    pub status: ProtocolFetchStatus,
    pub pools: usize,
    pub returned: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: i64,
    pub cached: bool,
    pub cache_age_ms: Option<u64>,
    pub deduplicated: bool,
    pub prices_stale: bool,
    pub partial_results: bool,
    pub protocol_status: HashMap<ProtocolKind, ProtocolStatusEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub pool_count: usize,
    pub active_pool_count: usize,
    pub rugged_pool_count: usize,
}

/// The Analyzer's full output (§3 `AnalysisResult`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub token: TokenInfo,
    pub summary: Summary,
    pub best_pools: BestPools,
    pub pools: Vec<Pool>,
    pub analysis: AnalysisBreakdown,
    pub performance: Performance,
    pub meta: Meta,
    pub warnings: Vec<Warning>,
}
