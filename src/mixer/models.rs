use serde::{Deserialize, Serialize};

/// A client of the mixer: one single-use deposit address and the ordered
/// return addresses that will eventually receive the mixed coins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub deposit_address: String,
    pub return_addresses: Vec<String>,
}

impl User {
    pub fn new(deposit_address: impl Into<String>, return_addresses: Vec<String>) -> Self {
        Self {
            deposit_address: deposit_address.into(),
            return_addresses,
        }
    }

    pub fn owns_return_address(&self, address: &str) -> bool {
        self.return_addresses.iter().any(|a| a == address)
    }
}
