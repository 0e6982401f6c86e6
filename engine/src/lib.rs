//! Pool Analytics Engine
//!
//! Live on-chain analysis of Base mainnet AMM liquidity pools: discovery
//! across Uniswap V2/V3 factories, price aggregation, rug-pull and
//! sandwich-risk scoring, and multi-hop route finding, all served over a
//! small HTTP surface.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod fetch;
pub mod model;
pub mod pricing;
pub mod routing;
pub mod rpc;
pub mod scoring;
pub mod tokens;
pub mod utils;

pub use analysis::Analyzer;
pub use api::{create_router, AppState};
pub use routing::{Quote, Route, RouteHop, RouteResult, Router};

pub use utils::error::{EngineError, Result};
pub use utils::types::*;

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic() {
        assert_eq!(2 + 2, 4);
    }
}
