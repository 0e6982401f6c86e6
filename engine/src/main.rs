use pool_analytics_engine::api::{create_router, AppState};
use pool_analytics_engine::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "pool_analytics_engine=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pool Analytics Engine...");

    let settings = Settings::load();
    tracing::info!(chain_id = settings.chain.chain_id, max_hops = settings.routing.max_hops, "configuration loaded");

    let state = AppState::new(settings.clone()).expect("failed to build application state");

    let base_addrs: Vec<_> = pool_analytics_engine::config::contracts::BaseTokens::all().into_iter().map(|t| t.parsed_address()).collect();
    tracing::info!(count = base_addrs.len(), "prefetching base token info...");
    if let Err(err) = state.token_registry.get_many(&base_addrs).await {
        tracing::warn!(error = %err, "base token prefetch failed, continuing");
    }

    tracing::info!("warming price oracle...");
    if let Err(err) = state.price_oracle.refresh_from_chain().await {
        tracing::warn!(error = %err, "initial price oracle warmup failed, continuing with seeded defaults");
    }

    let route_cache = state.route_cache.clone();
    tokio::spawn(route_cache.clone().run_refresh_loop(
        state.router.clone(),
        settings.safety.default_trade_usd,
        std::time::Duration::from_secs(settings.routing.route_cache_refresh_secs),
    ));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!(%addr, "binding listener");

    let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind");

    tracing::info!("Pool Analytics Engine listening on http://{addr}");
    tracing::info!("health check: http://{addr}/health");
    tracing::info!("analyze: http://{addr}/analyze/:token");

    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(route_cache))
        .await
        .expect("server failed");
}

/// Waits for Ctrl+C (or, on Unix, SIGTERM) and stops the route cache's
/// background pre-warmer before letting axum drain in-flight requests.
async fn shutdown_signal(route_cache: std::sync::Arc<pool_analytics_engine::routing::RouteCache>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, stopping background tasks");
    route_cache.request_shutdown();
}
