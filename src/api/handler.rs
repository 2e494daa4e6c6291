use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::models::*;
use crate::{
    error::{AppError, AppResult},
    gateway::InMemoryLedger,
    mixer::User,
    settlement::MixerHandle,
};

#[derive(Clone)]
pub struct AppState {
    pub mixer: MixerHandle,
    pub house_address: String,
    /// Present only when running against the in-memory ledger
    pub faucet: Option<Arc<InMemoryLedger>>,
}

/// Register a new mixer user
/// POST /api/users
///
/// The address check and the deposit address minting both happen on the
/// deposit polling task, so two concurrent requests can never claim the
/// same return address.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    info!(
        "Registering user with {} return addresses",
        request.return_addresses.len()
    );

    let user = state.mixer.register(request.return_addresses).await?;

    info!("✓ User registered, deposit address {}", user.deposit_address);
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let registered_users = state
        .mixer
        .registered_users()
        .await
        .map_err(|e| warn!("Health check could not count users: {}", e))
        .ok();
    let queued_payouts = state
        .mixer
        .queued_payouts()
        .await
        .map_err(|e| warn!("Health check could not count payouts: {}", e))
        .ok();

    let status = if registered_users.is_some() && queued_payouts.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        house_address: state.house_address,
        registered_users,
        queued_payouts,
    })
}

/// Create coins on the in-memory ledger
/// POST /api/faucet
pub async fn mint_coins(
    State(state): State<AppState>,
    Json(request): Json<MintRequest>,
) -> AppResult<StatusCode> {
    let faucet = state
        .faucet
        .ok_or_else(|| AppError::InvalidInput("faucet is only available on the in-memory ledger".to_string()))?;

    if request.amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput("amount must be positive".to_string()));
    }

    faucet.mint(&request.address, request.amount);
    Ok(StatusCode::CREATED)
}
