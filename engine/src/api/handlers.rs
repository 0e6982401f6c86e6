//! HTTP handlers for the §6 surface. Grounded on the teacher's
//! `api/handlers.rs` (`ApiError` + `IntoResponse`, `health_check`/
//! `get_quote` shape), generalized to the full analyze/route/trade surface
//! this engine exposes.

use std::sync::Arc;

use alloy_primitives::Address;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::dto::{
    AmountQuery, AnalyzeQuery, AnalyzeResponseData, ApiResponse, BestPoolCriteria, BestPoolQuery, BestPoolResponseData, CacheClearRequest, CacheStatsResponseData, ErrorResponse, HealthResponseData,
    PairResponseData, PoolsQuery, PoolsResponseData, PricesResponseData, QuoteRequest, QuoteResponseData, RouteQuery, RouteRequest, RouteResponseData, SetPriceRequest, SizesQuery,
    SplitLeg, SplitTradeResponseData, SwapPoolQuery, SwapPoolResponseData, TradeScenario, TradeScenariosResponseData,
};
use crate::api::state::AppState;
use crate::model::pool::ProtocolKind;
use rayon::prelude::*;
use crate::scoring::select_recommended;
use crate::utils::error::EngineError;

/// API-facing error shape, distinct from [`EngineError`] so the HTTP status
/// taxonomy stays independent of the domain error enum's variants.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PreconditionRequired(String),
    TooManyRequests(String),
    InternalError(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidAddress(_) | EngineError::InvalidAmount(_) | EngineError::InvalidEnum { .. } | EngineError::SwapBlocked { .. } => ApiError::BadRequest(err.to_string()),
            EngineError::NoRouteFound { .. } | EngineError::NoTradeablePool { .. } => ApiError::NotFound(err.to_string()),
            EngineError::TokenNotCached(_) => ApiError::PreconditionRequired(err.to_string()),
            EngineError::AllProvidersFailed(_) | EngineError::CacheError(_) | EngineError::Internal(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::PreconditionRequired(msg) => (StatusCode::PRECONDITION_REQUIRED, msg),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorResponse { success: false, error: status.canonical_reason().unwrap_or("Error").to_string(), message };
        (status, Json(body)).into_response()
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse::<Address>().map_err(|_| ApiError::BadRequest(format!("invalid token address: {raw}")))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let data = HealthResponseData { status: "healthy".to_string(), version: env!("CARGO_PKG_VERSION").to_string(), chain_id: state.settings.chain.chain_id };
    Json(ApiResponse::ok(data))
}

pub async fn analyze_token(State(state): State<Arc<AppState>>, Path(token): Path<String>, Query(query): Query<AnalyzeQuery>) -> Result<Json<ApiResponse<AnalyzeResponseData>>, ApiError> {
    let addr = parse_address(&token)?;
    let mut analysis = state.analyzer.analyze(addr, query.refresh).await?;

    if let Some(min_liquidity) = query.min_liquidity {
        analysis.pools.retain(|p| p.liquidity.total_usd >= min_liquidity);
    }
    if query.fast {
        analysis.pools.truncate(5);
    }

    Ok(Json(ApiResponse::ok(AnalyzeResponseData { analysis })))
}

pub async fn best_pool(State(state): State<Arc<AppState>>, Path(token): Path<String>, Query(query): Query<BestPoolQuery>) -> Result<Json<ApiResponse<BestPoolResponseData>>, ApiError> {
    let addr = parse_address(&token)?;
    let analysis = state.analyzer.analyze(addr, false).await?;

    let criteria = query.criteria.unwrap_or(BestPoolCriteria::Recommended);

    // `base_pair` narrows the candidate set to pools against that specific
    // pair token, re-running the relevant selection rule over the narrowed
    // set rather than the precomputed whole-pool-set `best_pools` variants.
    let narrowed: Vec<crate::model::pool::Pool>;
    let pools: &[crate::model::pool::Pool] = match query.base_pair {
        Some(base) => {
            narrowed = analysis.pools.iter().filter(|p| p.contains_token(base)).cloned().collect();
            &narrowed
        }
        None => &analysis.pools,
    };

    let selected = if query.base_pair.is_some() {
        match criteria {
            BestPoolCriteria::Recommended | BestPoolCriteria::Balanced => {
                let (_, recommended) = select_recommended(pools, addr, state.settings.safety.default_trade_usd, analysis.analysis.price_analysis.aggregated.avg_price_usd);
                Some(recommended.pool_address)
            }
            BestPoolCriteria::Liquidity => crate::scoring::best_by_liquidity(pools),
            BestPoolCriteria::Price => crate::scoring::best_by_price_usd(pools),
            BestPoolCriteria::Fee => crate::scoring::best_by_fee(pools),
            BestPoolCriteria::V2 => crate::scoring::best_by_protocol(pools).get(&ProtocolKind::V2).copied(),
            BestPoolCriteria::V3 => crate::scoring::best_by_protocol(pools).get(&ProtocolKind::V3).copied(),
        }
    } else {
        match criteria {
            BestPoolCriteria::Recommended | BestPoolCriteria::Balanced => Some(analysis.best_pools.recommended.pool_address),
            BestPoolCriteria::Liquidity => analysis.best_pools.by_liquidity,
            BestPoolCriteria::Price => analysis.best_pools.by_price_usd,
            BestPoolCriteria::Fee => analysis.best_pools.by_fee,
            BestPoolCriteria::V2 => analysis.best_pools.by_protocol.get(&ProtocolKind::V2).copied(),
            BestPoolCriteria::V3 => analysis.best_pools.by_protocol.get(&ProtocolKind::V3).copied(),
        }
    };

    let pool = selected.and_then(|addr| analysis.pools.iter().find(|p| p.address == addr).cloned());
    let criteria_label = format!("{criteria:?}").to_lowercase();

    Ok(Json(ApiResponse::ok(BestPoolResponseData { pool, criteria: criteria_label })))
}

pub async fn list_pools(State(state): State<Arc<AppState>>, Path(token): Path<String>, Query(query): Query<PoolsQuery>) -> Result<Json<ApiResponse<PoolsResponseData>>, ApiError> {
    let addr = parse_address(&token)?;
    let analysis = state.analyzer.analyze(addr, false).await?;

    let mut pools = analysis.pools;
    if let Some(kind) = query.protocol_type.as_deref() {
        pools.retain(|p| p.kind.as_str().eq_ignore_ascii_case(kind));
    }
    if let Some(min_liquidity) = query.min_liquidity {
        pools.retain(|p| p.liquidity.total_usd >= min_liquidity);
    }
    let total = pools.len();
    pools.truncate(query.limit);

    Ok(Json(ApiResponse::ok(PoolsResponseData { pools, total })))
}

pub async fn pair_pools(State(state): State<Arc<AppState>>, Path((token_a, token_b)): Path<(String, String)>) -> Result<Json<ApiResponse<PairResponseData>>, ApiError> {
    let addr_a = parse_address(&token_a)?;
    let addr_b = parse_address(&token_b)?;
    let analysis = state.analyzer.analyze(addr_a, false).await?;

    let pools = analysis.pools.into_iter().filter(|p| p.contains_token(addr_b)).collect();
    Ok(Json(ApiResponse::ok(PairResponseData { pools })))
}

pub async fn post_quote(State(state): State<Arc<AppState>>, Json(req): Json<QuoteRequest>) -> Result<Json<ApiResponse<QuoteResponseData>>, ApiError> {
    let amount_in: f64 = req.amount_in.parse().map_err(|_| EngineError::InvalidAmount(req.amount_in.clone()))?;
    let quote = state.router.get_quote(req.token_in, req.token_out, amount_in, req.slippage).await?;
    Ok(Json(ApiResponse::ok(QuoteResponseData { quote })))
}

pub async fn post_route(State(state): State<Arc<AppState>>, Json(req): Json<RouteRequest>) -> Result<Json<ApiResponse<RouteResponseData>>, ApiError> {
    let route = state.router.find_best_route(req.token_in, req.token_out, req.amount_in).await?;
    Ok(Json(ApiResponse::ok(RouteResponseData { route })))
}

pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path((token_in, token_out)): Path<(String, String)>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<ApiResponse<RouteResponseData>>, ApiError> {
    let token_in = parse_address(&token_in)?;
    let token_out = parse_address(&token_out)?;
    let amount_in = query.amount.unwrap_or(state.settings.safety.default_trade_usd);

    let route = state.router.find_best_route(token_in, token_out, amount_in).await?;
    Ok(Json(ApiResponse::ok(RouteResponseData { route })))
}

/// Derived only from the cache, never triggers a live fetch (§6): a cold
/// token yields `428 TOKEN_NOT_CACHED` rather than paying a fresh analysis.
pub async fn swap_pool(State(state): State<Arc<AppState>>, Path(token): Path<String>, Query(query): Query<SwapPoolQuery>) -> Result<Json<ApiResponse<SwapPoolResponseData>>, ApiError> {
    let addr = parse_address(&token)?;
    let eth_amount = query.eth.unwrap_or(1.0);
    let eth_price = state.price_oracle.get_native_price_usd();
    let trade_usd = eth_amount * eth_price;

    let analysis = state.cache.get_analysis(addr).ok_or(EngineError::TokenNotCached(addr))?;
    let (_, recommended) = select_recommended(&analysis.pools, addr, trade_usd, analysis.analysis.price_analysis.aggregated.avg_price_usd);

    let pool = analysis
        .pools
        .iter()
        .find(|p| p.address == recommended.pool_address)
        .cloned()
        .ok_or_else(|| EngineError::NoTradeablePool { token: addr, trade_usd })?;

    let wrapper = crate::config::contracts::BaseTokens::wrapper().parsed_address();
    let quote = crate::routing::Quote::from_pool(&pool, wrapper, eth_amount, 0.5);

    Ok(Json(ApiResponse::ok(SwapPoolResponseData { token: addr, recommended_pool: pool, quote })))
}

pub async fn smart_recommend(State(state): State<Arc<AppState>>, Path(token): Path<String>, Query(query): Query<AmountQuery>) -> Result<Json<ApiResponse<BestPoolResponseData>>, ApiError> {
    let addr = parse_address(&token)?;
    let trade_usd = query.amount.unwrap_or(state.settings.safety.default_trade_usd);

    let analysis = state.analyzer.analyze(addr, false).await?;
    let (_, recommended) = select_recommended(&analysis.pools, addr, trade_usd, analysis.analysis.price_analysis.aggregated.avg_price_usd);
    let pool = analysis.pools.iter().find(|p| p.address == recommended.pool_address).cloned();

    Ok(Json(ApiResponse::ok(BestPoolResponseData { pool, criteria: "recommended".to_string() })))
}

const DEFAULT_TRADE_SCENARIO_SIZES: [f64; 4] = [100.0, 1_000.0, 10_000.0, 100_000.0];

pub async fn trade_scenarios(State(state): State<Arc<AppState>>, Path(token): Path<String>, Query(query): Query<SizesQuery>) -> Result<Json<ApiResponse<TradeScenariosResponseData>>, ApiError> {
    let addr = parse_address(&token)?;
    let analysis = state.analyzer.analyze(addr, false).await?;

    let sizes: Vec<f64> = match query.sizes.as_deref() {
        Some(raw) => raw.split(',').filter_map(|s| s.trim().parse::<f64>().ok()).collect(),
        None => DEFAULT_TRADE_SCENARIO_SIZES.to_vec(),
    };
    let sizes = if sizes.is_empty() { DEFAULT_TRADE_SCENARIO_SIZES.to_vec() } else { sizes };

    // Re-scoring every pool at each candidate size is independent per size, so
    // evaluate the scenarios concurrently the way the teacher's
    // `simulate_amounts_parallel` evaluates a batch of trade amounts.
    let scenarios = sizes
        .into_par_iter()
        .map(|trade_usd| {
            let (_, recommended) = select_recommended(&analysis.pools, addr, trade_usd, analysis.analysis.price_analysis.aggregated.avg_price_usd);
            TradeScenario { trade_usd, recommended }
        })
        .collect();

    Ok(Json(ApiResponse::ok(TradeScenariosResponseData { scenarios })))
}

/// Greedy split-trade heuristic (§9 Open Question #2, resolved in
/// SPEC_FULL.md: cap any single pool at 50% of total notional, and cap any
/// pool's own liquidity consumption at 5%). Not an optimizer — repeated
/// passes over the tradeable pools in ascending cost order, each pass
/// topping each pool up to whichever cap binds first, until the trade is
/// fully placed or every pool is capped out. Grounded on the teacher's
/// `routing/split.rs` percentage-bucketed heuristic, which documents the
/// same non-optimality caveat.
pub async fn split_trade(State(state): State<Arc<AppState>>, Path(token): Path<String>, Query(query): Query<AmountQuery>) -> Result<Json<ApiResponse<SplitTradeResponseData>>, ApiError> {
    let addr = parse_address(&token)?;
    let trade_usd = query.amount.unwrap_or(state.settings.safety.default_trade_usd);
    let analysis = state.analyzer.analyze(addr, false).await?;

    let (scores, _) = select_recommended(&analysis.pools, addr, trade_usd, analysis.analysis.price_analysis.aggregated.avg_price_usd);
    let mut tradeable: Vec<_> = scores.into_iter().filter(|s| s.tradeable).collect();
    tradeable.sort_by(|a, b| a.costs.total_cost_pct.partial_cmp(&b.costs.total_cost_pct).unwrap());

    if tradeable.is_empty() {
        return Err(EngineError::NoTradeablePool { token: addr, trade_usd }.into());
    }

    let liquidity_of = |pool_address: Address| analysis.pools.iter().find(|p| p.address == pool_address).map(|p| p.liquidity.total_usd).unwrap_or(0.0);
    let max_per_pool_total = 0.5 * trade_usd;

    let mut allocated: std::collections::HashMap<Address, f64> = std::collections::HashMap::new();
    let mut remaining = trade_usd;
    loop {
        let mut progress = false;
        for s in &tradeable {
            if remaining <= 1e-9 {
                break;
            }
            let liq = liquidity_of(s.pool_address);
            let already = *allocated.get(&s.pool_address).unwrap_or(&0.0);
            let room = (max_per_pool_total - already).min(0.05 * liq - already).min(remaining).max(0.0);
            if room > 1e-9 {
                *allocated.entry(s.pool_address).or_insert(0.0) += room;
                remaining -= room;
                progress = true;
            }
        }
        if !progress || remaining <= 1e-9 {
            break;
        }
    }

    let mut legs: Vec<SplitLeg> = allocated
        .into_iter()
        .map(|(pool_address, amount_usd)| SplitLeg { pool_address, percentage: ((amount_usd / trade_usd) * 100.0).round() as u8, amount_usd })
        .collect();
    legs.sort_by(|a, b| b.amount_usd.partial_cmp(&a.amount_usd).unwrap());

    Ok(Json(ApiResponse::ok(SplitTradeResponseData { legs, total_usd: trade_usd, unallocated_usd: remaining.max(0.0) })))
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let data = CacheStatsResponseData { pools: state.cache.pools.len(), prices: state.cache.prices.len(), tokens: state.cache.tokens.len(), analyses: state.cache.analyses.len() };
    Json(ApiResponse::ok(data))
}

pub async fn cache_clear(State(state): State<Arc<AppState>>, Json(req): Json<CacheClearRequest>) -> Result<impl IntoResponse, ApiError> {
    match req.kind.as_str() {
        "all" => {
            state.cache.pools.clear();
            state.cache.prices.clear();
            state.cache.tokens.clear();
            state.cache.analyses.clear();
        }
        "pools" => state.cache.pools.clear(),
        "prices" => state.cache.prices.clear(),
        "tokens" => state.cache.tokens.clear(),
        "analyses" => state.cache.analyses.clear(),
        other => return Err(ApiError::BadRequest(format!("unknown cache kind: {other}"))),
    }
    Ok(Json(ApiResponse::ok(serde_json::json!({ "cleared": req.kind }))))
}

pub async fn get_prices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(PricesResponseData { prices: state.price_oracle.all_prices() }))
}

pub async fn set_price(State(state): State<Arc<AppState>>, Json(req): Json<SetPriceRequest>) -> Result<impl IntoResponse, ApiError> {
    if req.price <= 0.0 {
        return Err(ApiError::BadRequest("price must be positive".to_string()));
    }
    state.price_oracle.set_price_usd(req.token, req.price);
    Ok(Json(ApiResponse::ok(serde_json::json!({ "token": req.token, "price": req.price }))))
}
