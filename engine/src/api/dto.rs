//! Request/response shapes for the HTTP surface (§6). Grounded on the
//! teacher's `api/dto.rs`, generalized from a single quote DTO pair to the
//! full envelope this engine's surface needs.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::model::analysis::AnalysisResult;
use crate::model::pool::Pool;
use crate::routing::{Quote, RouteResult};
use crate::scoring::PoolScore;

/// Every handler responds `{success, ...}` (§6); `ApiResponse::ok` wraps the
/// payload, `ApiError` (see `handlers.rs`) renders the failure shape.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub refresh: bool,
    #[serde(default)]
    pub fast: bool,
    pub min_liquidity: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponseData {
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BestPoolCriteria {
    Liquidity,
    Price,
    Fee,
    V2,
    V3,
    Balanced,
    Recommended,
}

#[derive(Debug, Deserialize)]
pub struct BestPoolQuery {
    pub criteria: Option<BestPoolCriteria>,
    pub base_pair: Option<Address>,
    pub price_direction: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BestPoolResponseData {
    pub pool: Option<Pool>,
    pub criteria: String,
}

#[derive(Debug, Deserialize)]
pub struct PoolsQuery {
    #[serde(rename = "type")]
    pub protocol_type: Option<String>,
    pub min_liquidity: Option<f64>,
    #[serde(default = "default_pools_limit")]
    pub limit: usize,
}

fn default_pools_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
pub struct PoolsResponseData {
    pub pools: Vec<Pool>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct PairResponseData {
    pub pools: Vec<Pool>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: String,
    #[serde(default = "default_slippage")]
    pub slippage: f64,
}

fn default_slippage() -> f64 {
    0.5
}

#[derive(Debug, Serialize)]
pub struct QuoteResponseData {
    pub quote: Quote,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: f64,
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RouteResponseData {
    #[serde(flatten)]
    pub route: RouteResult,
}

#[derive(Debug, Deserialize)]
pub struct SwapPoolQuery {
    pub eth: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SwapPoolResponseData {
    pub token: Address,
    pub recommended_pool: Pool,
    pub quote: Quote,
}

#[derive(Debug, Deserialize)]
pub struct AmountQuery {
    pub amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SizesQuery {
    pub sizes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TradeScenario {
    pub trade_usd: f64,
    pub recommended: PoolScore,
}

#[derive(Debug, Serialize)]
pub struct TradeScenariosResponseData {
    pub scenarios: Vec<TradeScenario>,
}

#[derive(Debug, Serialize)]
pub struct SplitLeg {
    pub pool_address: Address,
    pub percentage: u8,
    pub amount_usd: f64,
}

#[derive(Debug, Serialize)]
pub struct SplitTradeResponseData {
    pub legs: Vec<SplitLeg>,
    pub total_usd: f64,
    pub unallocated_usd: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponseData {
    pub status: String,
    pub version: String,
    pub chain_id: u64,
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponseData {
    pub pools: usize,
    pub prices: usize,
    pub tokens: usize,
    pub analyses: usize,
}

#[derive(Debug, Deserialize)]
pub struct CacheClearRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct PricesResponseData {
    pub prices: std::collections::HashMap<Address, f64>,
}

#[derive(Debug, Deserialize)]
pub struct SetPriceRequest {
    pub token: Address,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}
