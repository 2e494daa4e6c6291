use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

// ========== REQUEST MODELS ==========

/// Body of `POST /api/users`. Any client-supplied deposit address is ignored.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, message = "at least one return address is required"))]
    pub return_addresses: Vec<String>,
}

/// Body of `POST /api/faucet`, only routed with the in-memory ledger
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MintRequest {
    pub address: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

// ========== RESPONSE MODELS ==========

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub house_address: String,
    pub registered_users: Option<usize>,
    pub queued_payouts: Option<usize>,
}
