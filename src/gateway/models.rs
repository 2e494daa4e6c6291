use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single transfer as recorded by the external ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    pub timestamp: DateTime<Utc>,
    /// Absent for coins created out of thin air by the ledger's faucet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    pub to_address: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

impl LedgerTransaction {
    pub fn is_from(&self, address: &str) -> bool {
        self.from_address.as_deref() == Some(address)
    }
}

/// Point-in-time view of one address. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshot {
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
    #[serde(default)]
    pub transactions: Vec<LedgerTransaction>,
}

/// Outbound transfer body, `{ fromAddress, toAddress, amount }` on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
}
