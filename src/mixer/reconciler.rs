use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::AppResult;
use crate::gateway::{LedgerGateway, LedgerTransaction};
use crate::mixer::models::User;

/// Derives what the house still owes a user from the house address history.
///
/// Nothing is cached between rounds: the ledger is the only source of truth,
/// so a restarted mixer computes the same entitlement as one that never
/// stopped.
pub struct BalanceReconciler {
    ledger: Arc<dyn LedgerGateway>,
    house_address: String,
}

impl BalanceReconciler {
    pub fn new(ledger: Arc<dyn LedgerGateway>, house_address: String) -> Self {
        Self {
            ledger,
            house_address,
        }
    }

    /// Deposits swept to house minus everything house already returned.
    /// Not clamped; a malformed history can make this negative.
    pub async fn entitlement(&self, user: &User) -> AppResult<Decimal> {
        let house = self.ledger.get_address_info(&self.house_address).await?;
        let owed = entitlement_from_history(user, &self.house_address, &house.transactions);

        debug!(
            "Entitlement for {}: {} ({} house transactions scanned)",
            user.deposit_address,
            owed,
            house.transactions.len()
        );
        Ok(owed)
    }
}

/// Order-independent sum over the house history
pub fn entitlement_from_history(
    user: &User,
    house_address: &str,
    transactions: &[LedgerTransaction],
) -> Decimal {
    let mut deposited = Decimal::ZERO;
    let mut returned = Decimal::ZERO;

    for tx in transactions {
        if tx.is_from(&user.deposit_address) && tx.to_address == house_address {
            deposited += tx.amount;
        }
        if tx.is_from(house_address) && user.owns_return_address(&tx.to_address) {
            returned += tx.amount;
        }
    }

    deposited - returned
}
