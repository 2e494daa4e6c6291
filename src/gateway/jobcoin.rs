use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AppResult, LedgerError};
use crate::gateway::models::{AddressSnapshot, TransferRequest};
use crate::gateway::LedgerGateway;

/// Error body returned by the Jobcoin API on a rejected transaction.
/// The `error` field is usually a string but is not guaranteed to be one.
#[derive(Debug, Deserialize)]
struct JobcoinErrorBody {
    error: serde_json::Value,
}

/// Jobcoin REST client
pub struct JobcoinClient {
    client: Client,
    base_url: String,
}

impl JobcoinClient {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn addresses_endpoint(&self, address: &str) -> String {
        format!("{}/addresses/{}", self.base_url, address)
    }

    fn transactions_endpoint(&self) -> String {
        format!("{}/transactions", self.base_url)
    }
}

#[async_trait]
impl LedgerGateway for JobcoinClient {
    async fn get_address_info(&self, address: &str) -> AppResult<AddressSnapshot> {
        let url = self.addresses_endpoint(address);
        debug!("Fetching address info: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Address lookup for {} returned {}", address, status);
            return Err(LedgerError::Transport(format!(
                "address lookup returned HTTP {}",
                status
            ))
            .into());
        }

        let snapshot = response.json::<AddressSnapshot>().await?;
        Ok(snapshot)
    }

    async fn send_funds(
        &self,
        from_address: &str,
        to_address: &str,
        amount: &str,
    ) -> AppResult<()> {
        let body = TransferRequest {
            from_address: from_address.to_string(),
            to_address: to_address.to_string(),
            amount: amount.to_string(),
        };

        let response = self
            .client
            .post(self.transactions_endpoint())
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let api_error = response
            .json::<JobcoinErrorBody>()
            .await
            .map_err(|e| LedgerError::Decode(format!("HTTP {} with unreadable body: {}", status, e)))?;

        let message = match api_error.error {
            serde_json::Value::String(message) => message,
            other => other.to_string(),
        };
        warn!(
            "Transfer of {} from {} to {} rejected: {}",
            amount, from_address, to_address, message
        );

        Err(LedgerError::Rejected(message).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use axum::{
        extract::Path,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use rust_decimal_macros::dec;

    /// Serves a canned Jobcoin API on an ephemeral local port
    async fn spawn_jobcoin_stub() -> String {
        let app = Router::new()
            .route(
                "/api/addresses/:address",
                get(|Path(address): Path<String>| async move {
                    Json(serde_json::json!({
                        "balance": if address == "alice" { "12.5" } else { "0" },
                        "transactions": [
                            {
                                "timestamp": "2014-04-22T13:10:01.210Z",
                                "toAddress": "alice",
                                "amount": "50.35"
                            },
                            {
                                "timestamp": "2014-04-23T13:10:01.210Z",
                                "fromAddress": "alice",
                                "toAddress": "bob",
                                "amount": "37.85"
                            }
                        ]
                    }))
                }),
            )
            .route(
                "/api/transactions",
                post(|Json(body): Json<TransferRequest>| async move {
                    if body.from_address == "alice" {
                        (StatusCode::OK, Json(serde_json::json!({ "status": "OK" })))
                    } else {
                        (
                            StatusCode::UNPROCESSABLE_ENTITY,
                            Json(serde_json::json!({ "error": "Insufficient Funds" })),
                        )
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/api/", address)
    }

    #[tokio::test]
    async fn test_get_address_info_decodes_history() {
        let base_url = spawn_jobcoin_stub().await;
        let client = JobcoinClient::new(&base_url, Duration::from_secs(5)).unwrap();

        let snapshot = client.get_address_info("alice").await.unwrap();

        assert_eq!(snapshot.balance, dec!(12.5));
        assert_eq!(snapshot.transactions.len(), 2);
        assert_eq!(snapshot.transactions[0].from_address, None);
        assert!(snapshot.transactions[1].is_from("alice"));
        assert_eq!(snapshot.transactions[1].amount, dec!(37.85));
    }

    #[tokio::test]
    async fn test_send_funds_success() {
        let base_url = spawn_jobcoin_stub().await;
        let client = JobcoinClient::new(&base_url, Duration::from_secs(5)).unwrap();

        client.send_funds("alice", "bob", "1.5").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_funds_surfaces_api_error_message() {
        let base_url = spawn_jobcoin_stub().await;
        let client = JobcoinClient::new(&base_url, Duration::from_secs(5)).unwrap();

        let err = client.send_funds("carol", "bob", "1.5").await.unwrap_err();

        match err {
            AppError::Ledger(LedgerError::Rejected(message)) => {
                assert_eq!(message, "Insufficient Funds")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_ledger_is_transport_error() {
        let client = JobcoinClient::new("http://127.0.0.1:1/api", Duration::from_secs(1)).unwrap();

        let err = client.get_address_info("alice").await.unwrap_err();

        assert!(matches!(err, AppError::Ledger(LedgerError::Transport(_))));
    }
}
