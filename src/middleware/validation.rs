use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use validator::Validate;

use crate::error::ErrorResponse;

/// Largest request body the JSON validator will buffer
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid request body")]
    UnreadableBody,

    /// Carries the decoder's message, reported under `details`
    #[error("Invalid request body")]
    MalformedJson(String),

    #[error("Validation failed: {0}")]
    InvalidInput(String),
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let (error_code, details) = match &self {
            ValidationError::UnreadableBody => ("INVALID_BODY", None),
            ValidationError::MalformedJson(reason) => {
                ("INVALID_BODY", Some(serde_json::json!({ "reason": reason })))
            }
            ValidationError::InvalidInput(_) => ("VALIDATION_FAILED", None),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Rejects bodies that do not decode as `T` or fail `T`'s validation rules,
/// then hands the untouched bytes on to the handler.
pub async fn validate_json<T: DeserializeOwned + Validate>(
    req: Request,
    next: Next,
) -> Result<Response, ValidationError> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ValidationError::UnreadableBody)?;

    let value: T = serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::MalformedJson(e.to_string()))?;

    value.validate().map_err(|e| {
        let errors = e
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages: Vec<String> = errors
                    .iter()
                    .map(|e| e.message.as_ref().map(|s| s.to_string()).unwrap_or_default())
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<String>>()
            .join("; ");

        ValidationError::InvalidInput(errors)
    })?;

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}
