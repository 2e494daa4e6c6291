use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::gateway::LedgerGateway;
use crate::mixer::models::User;
use crate::mixer::planner::DistributionPlanner;
use crate::mixer::BalanceReconciler;

/// Pays users back out of the house address, one round at a time
pub struct ReturnScheduler {
    ledger: Arc<dyn LedgerGateway>,
    reconciler: BalanceReconciler,
    planner: DistributionPlanner,
    house_address: String,
}

impl ReturnScheduler {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        planner: DistributionPlanner,
        house_address: String,
    ) -> Self {
        Self {
            reconciler: BalanceReconciler::new(ledger.clone(), house_address.clone()),
            ledger,
            planner,
            house_address,
        }
    }

    /// Run one payout round for `user`.
    ///
    /// `Ok(true)` means nothing is owed after this round: either the
    /// entitlement was already settled, or the round covered all of it and
    /// every transfer went through. Transfers are all attempted even after
    /// one fails.
    pub async fn settle(&self, user: &User) -> AppResult<bool> {
        let owed = self.reconciler.entitlement(user).await?;

        if owed <= Decimal::ZERO {
            if owed < Decimal::ZERO {
                warn!(
                    "⚠️ House history shows {} overpaid by {}; treating as settled",
                    user.deposit_address,
                    owed.abs()
                );
            }
            return Ok(true);
        }

        let plan = self.planner.plan(&user.return_addresses, owed);
        let mut fully_paid = !plan.partial;

        for payout in plan.payouts.iter().filter(|p| p.is_sendable()) {
            match self
                .ledger
                .send_funds(&self.house_address, &payout.address, &payout.wire_amount)
                .await
            {
                Ok(()) => info!(
                    "💸 Returned {} to {} for {}",
                    payout.wire_amount, payout.address, user.deposit_address
                ),
                Err(e) => {
                    warn!(
                        "❌ Return of {} to {} failed: {}",
                        payout.wire_amount, payout.address, e
                    );
                    fully_paid = false;
                }
            }
        }

        info!(
            "Round for {}: owed {}, paid out up to {}, fully paid: {}",
            user.deposit_address, owed, plan.round_amount, fully_paid
        );
        Ok(fully_paid)
    }
}
