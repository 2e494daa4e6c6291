use std::collections::HashMap;
#[cfg(test)]
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{AppResult, LedgerError};
use crate::gateway::models::{AddressSnapshot, LedgerTransaction};
use crate::gateway::LedgerGateway;

/// One call to `send_funds`, successful or not
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAttempt {
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub accepted: bool,
}

#[derive(Default)]
struct LedgerState {
    transactions: Vec<LedgerTransaction>,
    balances: HashMap<String, Decimal>,
    #[cfg(test)]
    faults: Faults,
}

/// Recorded calls and injected failures, only built into tests
#[cfg(test)]
#[derive(Default)]
struct Faults {
    attempts: Vec<TransferAttempt>,
    unreachable: HashSet<String>,
    refused_recipients: HashSet<String>,
}

/// In-process ledger with the same semantics as the Jobcoin API: an
/// append-only transaction list, balances derived from it, and transfers
/// refused when the sender cannot cover them.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create coins out of thin air, like the Jobcoin faucet
    pub fn mint(&self, address: &str, amount: Decimal) {
        let mut state = self.state.lock();
        state.transactions.push(LedgerTransaction {
            timestamp: Utc::now(),
            from_address: None,
            to_address: address.to_string(),
            amount,
        });
        *state.balances.entry(address.to_string()).or_insert(Decimal::ZERO) += amount;
        info!("🪙 Minted {} to {}", amount, address);
    }

    /// Append an already-settled transaction to the history without checking
    /// the sender's balance.
    #[cfg(test)]
    pub fn record(&self, from_address: &str, to_address: &str, amount: Decimal) {
        let mut state = self.state.lock();
        Self::apply(&mut state, from_address, to_address, amount);
    }

    /// Every `send_funds` call seen so far, in call order
    #[cfg(test)]
    pub fn transfer_attempts(&self) -> Vec<TransferAttempt> {
        self.state.lock().faults.attempts.clone()
    }

    /// Make reads of `address` fail as if the ledger were down
    #[cfg(test)]
    pub fn set_unreachable(&self, address: &str) {
        self.state.lock().faults.unreachable.insert(address.to_string());
    }

    /// Reject every transfer addressed to `address`
    #[cfg(test)]
    pub fn refuse_transfers_to(&self, address: &str) {
        self.state
            .lock()
            .faults
            .refused_recipients
            .insert(address.to_string());
    }

    fn apply(state: &mut LedgerState, from_address: &str, to_address: &str, amount: Decimal) {
        state.transactions.push(LedgerTransaction {
            timestamp: Utc::now(),
            from_address: Some(from_address.to_string()),
            to_address: to_address.to_string(),
            amount,
        });
        *state.balances.entry(from_address.to_string()).or_insert(Decimal::ZERO) -= amount;
        *state.balances.entry(to_address.to_string()).or_insert(Decimal::ZERO) += amount;
    }

    fn check_transfer(
        state: &LedgerState,
        from_address: &str,
        amount: &str,
    ) -> Result<Decimal, LedgerError> {
        let value: Decimal = amount
            .trim()
            .parse()
            .map_err(|_| LedgerError::Rejected(format!("Invalid amount: {}", amount)))?;

        if value <= Decimal::ZERO {
            return Err(LedgerError::Rejected("Amount must be positive".to_string()));
        }

        let available = state.balances.get(from_address).copied().unwrap_or(Decimal::ZERO);
        if available < value {
            return Err(LedgerError::Rejected("Insufficient Funds".to_string()));
        }

        Ok(value)
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn get_address_info(&self, address: &str) -> AppResult<AddressSnapshot> {
        let state = self.state.lock();
        #[cfg(test)]
        if state.faults.unreachable.contains(address) {
            return Err(LedgerError::Transport(format!("{} is unreachable", address)).into());
        }

        let transactions = state
            .transactions
            .iter()
            .filter(|tx| tx.to_address == address || tx.is_from(address))
            .cloned()
            .collect();

        Ok(AddressSnapshot {
            balance: state.balances.get(address).copied().unwrap_or(Decimal::ZERO),
            transactions,
        })
    }

    async fn send_funds(
        &self,
        from_address: &str,
        to_address: &str,
        amount: &str,
    ) -> AppResult<()> {
        let mut state = self.state.lock();
        let outcome = Self::check_transfer(&state, from_address, amount);
        #[cfg(test)]
        let outcome = if state.faults.refused_recipients.contains(to_address) {
            Err(LedgerError::Transport(format!(
                "connection reset while sending to {}",
                to_address
            )))
        } else {
            outcome
        };

        #[cfg(test)]
        state.faults.attempts.push(TransferAttempt {
            from_address: from_address.to_string(),
            to_address: to_address.to_string(),
            amount: amount.to_string(),
            accepted: outcome.is_ok(),
        });

        let value = outcome?;
        Self::apply(&mut state, from_address, to_address, value);
        debug!("Transferred {} from {} to {}", value, from_address, to_address);
        Ok(())
    }
}
