use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::gateway::LedgerGateway;
use crate::mixer::models::User;

/// Moves funded deposit addresses into the house address
pub struct DepositSweeper {
    ledger: Arc<dyn LedgerGateway>,
    house_address: String,
}

impl DepositSweeper {
    pub fn new(ledger: Arc<dyn LedgerGateway>, house_address: String) -> Self {
        Self {
            ledger,
            house_address,
        }
    }

    /// Sweep the whole reported deposit balance to house in one transfer.
    ///
    /// Returns `Ok(true)` only when a transfer was made. An empty deposit
    /// address is left alone; a failed transfer leaves it untouched for the
    /// next cycle.
    pub async fn sweep(&self, user: &User) -> AppResult<bool> {
        let deposit = self.ledger.get_address_info(&user.deposit_address).await?;

        if deposit.balance <= Decimal::ZERO {
            debug!("Deposit address {} is empty", user.deposit_address);
            return Ok(false);
        }

        self.ledger
            .send_funds(
                &user.deposit_address,
                &self.house_address,
                &deposit.balance.to_string(),
            )
            .await?;

        info!(
            "✓ Swept {} from {} to house",
            deposit.balance, user.deposit_address
        );
        Ok(true)
    }
}
