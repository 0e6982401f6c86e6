//! Integration tests over the HTTP surface (§6). Grounded on the teacher's
//! `tests/api_test.rs` (`oneshot` requests against `create_router`), scoped
//! to endpoints that don't require a live chain call: health, cache, and
//! price-override management, plus the input-validation error paths.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pool_analytics_engine::api::{create_router, AppState};
use pool_analytics_engine::config::Settings;
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn test_state() -> AppState {
    AppState::new(Settings::default()).expect("app state should build without a live RPC connection")
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_check_reports_configured_chain_id() {
    let app = create_router(test_state());

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["chain_id"], 8453);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn cache_stats_starts_empty() {
    let app = create_router(test_state());

    let response = app.oneshot(Request::builder().uri("/cache/stats").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["pools"], 0);
    assert_eq!(json["analyses"], 0);
}

#[tokio::test]
async fn analyze_with_malformed_address_returns_bad_request() {
    let app = create_router(test_state());

    let response = app.oneshot(Request::builder().uri("/analyze/not-an-address").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("invalid"));
}

#[tokio::test]
async fn quote_with_unparseable_amount_returns_bad_request() {
    let app = create_router(test_state());

    let body = json!({
        "token_in": "0x4200000000000000000000000000000000000006",
        "token_out": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        "amount_in": "not-a-number",
        "slippage": 0.5,
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/quote")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn prices_round_trip_through_get_and_post() {
    let app = create_router(test_state());
    let token = "0x532f27101965dd16442E59d40670FaF5eBB142E4";

    let set_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/prices")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "token": token, "price": 0.42 }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app.oneshot(Request::builder().uri("/prices").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);

    let json = body_json(get_response).await;
    let prices = json["prices"].as_object().unwrap();
    assert!(prices.values().any(|v| (v.as_f64().unwrap() - 0.42).abs() < 1e-9));
}

#[tokio::test]
async fn rejecting_a_negative_price_override_returns_bad_request() {
    let app = create_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/prices")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "token": "0x4200000000000000000000000000000000000006", "price": -1.0 }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cache_clear_rejects_unknown_kind() {
    let app = create_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cache/clear")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "type": "not-a-real-store" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cache_clear_accepts_all() {
    let app = create_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cache/clear")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "type": "all" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
