// Ledger gateway - the only way the mixer reads or moves coins
pub mod jobcoin;
pub mod memory;
pub mod models;

pub use jobcoin::JobcoinClient;
pub use memory::InMemoryLedger;
pub use models::{AddressSnapshot, LedgerTransaction};

use async_trait::async_trait;

use crate::error::AppResult;

/// Gateway trait - implemented by every ledger backend
///
/// Stateless from the caller's point of view and shared by both polling
/// loops without coordination.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Current balance and full transaction history of `address`
    async fn get_address_info(&self, address: &str) -> AppResult<AddressSnapshot>;

    /// Move `amount` from one address to another.
    ///
    /// Any error means the transfer did not happen.
    async fn send_funds(&self, from_address: &str, to_address: &str, amount: &str)
        -> AppResult<()>;
}
