//! Shared application state (§6). Grounded on the teacher's `api/state.rs`
//! (`AppState::new(settings)` constructing the whole dependency graph),
//! generalized to this engine's RPC/cache/analysis/routing stack.

use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::cache::EngineCache;
use crate::config::Settings;
use crate::discovery::Discovery;
use crate::fetch::PoolFetcher;
use crate::pricing::PriceOracle;
use crate::rpc::{BatchCaller, RpcGateway};
use crate::routing::{RouteCache, Router};
use crate::tokens::TokenRegistry;
use crate::utils::error::Result;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub router: Arc<Router>,
    pub route_cache: Arc<RouteCache>,
    pub cache: Arc<EngineCache>,
    pub price_oracle: Arc<PriceOracle>,
    pub token_registry: Arc<TokenRegistry>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let gateway = Arc::new(RpcGateway::new(settings.rpc.clone())?);
        let multicall3: alloy_primitives::Address = settings.chain.multicall3.parse().map_err(|_| crate::utils::error::EngineError::Internal("invalid multicall3 address in settings".to_string()))?;
        let batch_caller = Arc::new(BatchCaller::new(Arc::clone(&gateway), multicall3));

        let cache = Arc::new(EngineCache::new(&settings.cache));
        let token_registry = Arc::new(TokenRegistry::new(Arc::clone(&batch_caller), Arc::clone(&cache)));
        let price_oracle = Arc::new(PriceOracle::new(Arc::clone(&batch_caller), settings.base_tokens.clone()));
        let contracts = crate::config::contracts::ContractAddresses::for_chain(settings.chain.chain_id).unwrap_or_default();
        let discovery = Arc::new(Discovery::new(Arc::clone(&batch_caller), contracts));
        let fetcher = Arc::new(PoolFetcher::new(Arc::clone(&batch_caller), Arc::clone(&token_registry), Arc::clone(&price_oracle)));

        let analyzer = Arc::new(Analyzer::new(Arc::clone(&cache), Arc::clone(&token_registry), Arc::clone(&price_oracle), discovery, fetcher, settings.safety.default_trade_usd));

        let route_cache = Arc::new(RouteCache::new(std::time::Duration::from_secs(settings.routing.route_cache_ttl_secs)));
        let router = Arc::new(Router::new(Arc::clone(&analyzer), Arc::clone(&route_cache)));

        Ok(Self { analyzer, router, route_cache, cache, price_oracle, token_registry, settings })
    }
}
