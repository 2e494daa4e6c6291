use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Failures talking to the external coin ledger.
///
/// The engine treats every variant of a failed transfer the same way: the
/// transfer did not happen. The message text is the only distinction.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger request failed: {0}")]
    Transport(String),

    #[error("Failed to create transaction due to: {0}")]
    Rejected(String),

    #[error("Malformed ledger response: {0}")]
    Decode(String),
}

/// Registration conflicts reported synchronously to the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Return address {0} is already in use")]
    AddressInUse(String),

    #[error("Return address {0} is listed more than once")]
    DuplicateAddress(String),
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Registration(RegistrationError::AddressInUse(address)) => (
                StatusCode::CONFLICT,
                "ADDRESS_IN_USE",
                format!("Return address {} is already in use", address),
                Some(serde_json::json!({ "address": address })),
            ),
            AppError::Registration(RegistrationError::DuplicateAddress(address)) => (
                StatusCode::BAD_REQUEST,
                "DUPLICATE_ADDRESS",
                format!("Return address {} is listed more than once", address),
                Some(serde_json::json!({ "address": address })),
            ),
            AppError::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", message, None)
            }
            AppError::Unavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                message,
                None,
            ),
            AppError::Ledger(_) => (
                StatusCode::BAD_GATEWAY,
                "LEDGER_ERROR",
                "The coin ledger could not be reached".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return AppError::Ledger(LedgerError::Decode(error.to_string()));
        }
        AppError::Ledger(LedgerError::Transport(error.to_string()))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
