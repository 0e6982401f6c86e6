//! Router facade (§4.11): `FindBestRoute`, grounded on the teacher's
//! `routing/router.rs` (cache-then-compute facade over the pathfinder
//! functions), generalized to drive the pathfinder off live [`Analyzer`]
//! output instead of a standing [`PoolGraph`].

use std::sync::Arc;

use alloy_primitives::Address;

use crate::analysis::Analyzer;
use crate::config::contracts::BaseTokens;
use crate::routing::cache::RouteCache;
use crate::routing::pathfinder::{find_direct_route, find_three_hop_routes, find_two_hop_routes};
use crate::routing::route::{Quote, Route};
use crate::utils::error::{EngineError, Result};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RouteResult {
    pub best: Route,
    pub alternatives: Vec<Route>,
}

pub struct Router {
    analyzer: Arc<Analyzer>,
    cache: Arc<RouteCache>,
}

impl Router {
    pub fn new(analyzer: Arc<Analyzer>, cache: Arc<RouteCache>) -> Self {
        Self { analyzer, cache }
    }

    /// Analyzes every token in `addrs` concurrently, discarding individual
    /// failures. Used by the route cache's refresh cycle to warm the
    /// Analyzer's own cache before walking a pair list (§4.5 Warmers).
    pub async fn warm_tokens(self: &Arc<Self>, addrs: &[Address]) {
        let futures = addrs.iter().map(|&addr| {
            let analyzer = Arc::clone(&self.analyzer);
            async move {
                if let Err(err) = analyzer.analyze(addr, false).await {
                    tracing::debug!(%addr, error = %err, "route cache token warmup failed");
                }
            }
        });
        futures::future::join_all(futures).await;
    }

    /// `FindBestRoute(tokenIn, tokenOut, amountIn)` (§4.11).
    pub async fn find_best_route(self: &Arc<Self>, token_in: Address, token_out: Address, amount_in: f64) -> Result<RouteResult> {
        if let Some(cached) = self.cache.get(token_in, token_out) {
            return Ok(RouteResult { best: rescale(&cached.best, amount_in), alternatives: cached.alternatives.iter().map(|r| rescale(r, amount_in)).collect() });
        }

        let (in_analysis, out_analysis) = tokio::join!(self.analyzer.analyze(token_in, false), self.analyzer.analyze(token_out, false));

        let in_analysis = in_analysis.ok();
        let out_analysis = out_analysis.ok();

        if in_analysis.is_none() && out_analysis.is_none() {
            return Err(EngineError::NoRouteFound { from: token_in, to: token_out });
        }

        let mut routes = Vec::new();

        if let Some(ref in_a) = in_analysis {
            if let Some(direct) = find_direct_route(in_a, token_in, token_out, amount_in) {
                routes.push(direct);
            }
        }

        if let (Some(ref in_a), Some(ref out_a)) = (&in_analysis, &out_analysis) {
            let mut bases: Vec<Address> = BaseTokens::primary().iter().map(|t| t.parsed_address()).collect();
            bases.extend(BaseTokens::secondary().iter().map(|t| t.parsed_address()));
            routes.extend(find_two_hop_routes(in_a, out_a, token_in, token_out, amount_in, &bases));
        }

        let best_so_far = routes.iter().map(|r| r.score).fold(f64::NEG_INFINITY, f64::max);
        if (best_so_far < 50.0 || routes.is_empty()) && in_analysis.is_some() && out_analysis.is_some() {
            let in_a = in_analysis.clone().unwrap();
            let out_a = out_analysis.clone().unwrap();
            let analyzer = Arc::clone(&self.analyzer);
            let three_hop = find_three_hop_routes(&in_a, &out_a, token_in, token_out, amount_in, move |addr| {
                let analyzer = Arc::clone(&analyzer);
                async move { analyzer.analyze(addr, false).await.ok() }
            })
            .await;
            routes.extend(three_hop);
        }

        if routes.is_empty() {
            return Err(EngineError::NoRouteFound { from: token_in, to: token_out });
        }

        routes.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        let best = routes.remove(0);
        let alternatives = routes.into_iter().take(3).collect();

        let result = RouteResult { best, alternatives };
        self.cache.set(token_in, token_out, result.clone());
        Ok(result)
    }

    /// `POST/GET quote`: the best direct pool for `tokenIn`, quoted at
    /// `amountIn` with a slippage-adjusted minimum out.
    pub async fn get_quote(&self, token_in: Address, token_out: Address, amount_in: f64, slippage_pct: f64) -> Result<Quote> {
        let analysis = self.analyzer.analyze(token_in, false).await?;
        let pool = analysis
            .pools
            .iter()
            .filter(|p| !p.is_rugged() && p.contains_token(token_out))
            .max_by(|a, b| a.liquidity.total_usd.partial_cmp(&b.liquidity.total_usd).unwrap())
            .ok_or(EngineError::NoRouteFound { from: token_in, to: token_out })?;

        Ok(Quote::from_pool(pool, token_in, amount_in, slippage_pct))
    }
}

/// Cached routes store amounts computed at the original `amountIn`; a cache
/// hit at a different size rescales linearly rather than recomputing legs
/// (cheap approximation, reasonable since price impact is already baked into
/// the cached route's score and `totalPriceImpactPct`).
fn rescale(route: &Route, amount_in: f64) -> Route {
    if route.amount_in <= 0.0 {
        return route.clone();
    }
    let factor = amount_in / route.amount_in;
    let mut scaled = route.clone();
    scaled.amount_in = amount_in;
    scaled.amount_out *= factor;
    for hop in scaled.hops.iter_mut() {
        hop.amount_in *= factor;
        hop.amount_out *= factor;
    }
    scaled
}
