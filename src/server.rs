use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    api::{
        handler::{health_check, mint_coins, register_user, AppState},
        models::RegisterUserRequest,
    },
    middleware::{create_cors_layer, rate_limit_middleware, validate_json, RateLimitLayer},
};

pub async fn create_app(state: AppState, registration_limit: RateLimitLayer) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let mut api = Router::new().route(
        "/users",
        post(register_user)
            .route_layer(from_fn(validate_json::<RegisterUserRequest>))
            .route_layer(from_fn_with_state(
                Arc::new(registration_limit),
                rate_limit_middleware,
            )),
    );

    if state.faucet.is_some() {
        api = api.route("/faucet", post(mint_coins));
        info!("🪙 Faucet enabled at /api/faucet");
    }

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown signal received");
}
