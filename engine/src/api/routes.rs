//! Route table (§6). Grounded on the teacher's `api/routes.rs`
//! (CORS `Any` + `TraceLayer`, `with_state(Arc::new(state))`), generalized
//! to the full endpoint surface.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::FutureExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{
    analyze_token, best_pool, cache_clear, cache_stats, get_prices, get_route, health_check, list_pools, pair_pools, post_quote, post_route, set_price, smart_recommend, split_trade, swap_pool,
    trade_scenarios,
};
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/analyze/:token", get(analyze_token))
        .route("/best-pool/:token", get(best_pool))
        .route("/pools/:token", get(list_pools))
        .route("/pair/:token_a/:token_b", get(pair_pools))
        .route("/quote", post(post_quote))
        .route("/route", post(post_route))
        .route("/route/:token_in/:token_out", get(get_route))
        .route("/swap-pool/:token", get(swap_pool))
        .route("/smart-recommend/:token", get(smart_recommend))
        .route("/trade-scenarios/:token", get(trade_scenarios))
        .route("/split-trade/:token", get(split_trade))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(cache_clear))
        .route("/prices", get(get_prices).post(set_price))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(catch_panic))
        .with_state(Arc::new(state))
}

/// Top-level panic boundary (§7): a handler panic is caught, logged, and
/// turned into a 500 rather than tearing down the whole connection/worker.
async fn catch_panic(request: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            tracing::error!(panic = %panic_message(&panic), "request handler panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(serde_json::json!({
                    "success": false,
                    "error": "internal_error",
                    "message": "internal server error",
                })),
            )
                .into_response()
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_extracts_str_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }

    #[test]
    fn panic_message_falls_back_for_unknown_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(42i32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
