// Return polling loop - owns the payout queue.
//
// On each tick every queued user gets one payout round; users still owed
// afterwards stay queued in the same order. Swept users arrive on the inbox
// from the deposit loop.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::mixer::{PayoutQueue, ReturnScheduler, User};
use crate::settlement::scheduler::polling_interval;

/// Messages accepted by the return polling task
#[derive(Debug)]
pub enum ReturnCommand {
    /// Queue a swept user for payout, or move it to the back if already queued
    Enqueue(User),
    CountQueued { reply: oneshot::Sender<usize> },
}

pub struct ReturnPoller {
    scheduler: ReturnScheduler,
    queue: PayoutQueue,
    inbox: mpsc::UnboundedReceiver<ReturnCommand>,
    interval: Duration,
}

impl ReturnPoller {
    pub fn new(
        scheduler: ReturnScheduler,
        inbox: mpsc::UnboundedReceiver<ReturnCommand>,
        interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            queue: PayoutQueue::new(),
            inbox,
            interval,
        }
    }

    pub async fn run(mut self) {
        let mut ticker = polling_interval(self.interval);
        info!("🔄 Return polling started (every {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.settle_all().await;
                }
                command = self.inbox.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        info!("House queue closed, return polling stopped");
                        break;
                    }
                },
            }
        }
    }

    /// One payout round for every queued user
    async fn settle_all(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let queued = self.queue.drain();
        let total = queued.len();
        let mut still_owed = Vec::with_capacity(total);

        for user in queued {
            match self.scheduler.settle(&user).await {
                Ok(true) => info!("✓ {} fully paid, leaving house queue", user.deposit_address),
                Ok(false) => still_owed.push(user),
                Err(e) => {
                    warn!("Payout round for {} failed: {}", user.deposit_address, e);
                    still_owed.push(user);
                }
            }
        }

        info!(
            "✓ Return cycle finished: {} of {} users still owed",
            still_owed.len(),
            total
        );
        self.queue.replace(still_owed);
    }

    fn handle(&mut self, command: ReturnCommand) {
        match command {
            ReturnCommand::Enqueue(user) => {
                info!("Adding user {} to house queue", user.deposit_address);
                self.queue.insert(user);
            }
            ReturnCommand::CountQueued { reply } => {
                let _ = reply.send(self.queue.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{InMemoryLedger, LedgerGateway};
    use crate::mixer::{DistributionConfig, DistributionPlanner};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const HOUSE: &str = "house";

    fn poller(ledger: &Arc<InMemoryLedger>) -> ReturnPoller {
        let scheduler = ReturnScheduler::new(
            ledger.clone(),
            DistributionPlanner::new(DistributionConfig::default()),
            HOUSE.to_string(),
        );
        let (_tx, inbox) = mpsc::unbounded_channel();
        ReturnPoller::new(scheduler, inbox, Duration::from_secs(6))
    }

    fn user(deposit: &str) -> User {
        User::new(
            deposit,
            vec![format!("{}-r1", deposit), format!("{}-r2", deposit)],
        )
    }

    async fn fund_house(ledger: &InMemoryLedger, user: &User, amount: Decimal) {
        ledger.mint(&user.deposit_address, amount);
        ledger
            .send_funds(&user.deposit_address, HOUSE, &amount.to_string())
            .await
            .unwrap();
    }

    fn queued(poller: &ReturnPoller) -> Vec<String> {
        poller
            .queue
            .users()
            .iter()
            .map(|u| u.deposit_address.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_enqueue_refreshes_existing_entry() {
        let ledger = Arc::new(InMemoryLedger::new());
        let mut poller = poller(&ledger);

        poller.handle(ReturnCommand::Enqueue(user("a")));
        poller.handle(ReturnCommand::Enqueue(user("b")));
        poller.handle(ReturnCommand::Enqueue(user("a")));

        assert_eq!(queued(&poller), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_fully_paid_users_leave_queue() {
        let ledger = Arc::new(InMemoryLedger::new());
        let small = user("small");
        let large = user("large");
        fund_house(&ledger, &small, dec!(2)).await;
        fund_house(&ledger, &large, dec!(12)).await;

        let mut poller = poller(&ledger);
        poller.handle(ReturnCommand::Enqueue(small.clone()));
        poller.handle(ReturnCommand::Enqueue(large.clone()));

        poller.settle_all().await;
        assert_eq!(queued(&poller), vec!["large"]);

        // 12 coins at 5 per round: two more rounds clear it.
        poller.settle_all().await;
        poller.settle_all().await;
        assert!(poller.queue.is_empty());

        let returned: Decimal = [&large.return_addresses[0], &large.return_addresses[1]]
            .iter()
            .map(|a| received_by(&ledger, a))
            .sum();
        assert!((returned - dec!(12)).abs() <= dec!(0.00001));
    }

    fn received_by(ledger: &InMemoryLedger, address: &str) -> Decimal {
        ledger
            .transfer_attempts()
            .iter()
            .filter(|a| a.accepted && a.to_address == address)
            .map(|a| a.amount.parse::<Decimal>().unwrap())
            .sum()
    }

    #[tokio::test]
    async fn test_read_failure_keeps_user_queued() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_unreachable(HOUSE);
        let mut poller = poller(&ledger);
        poller.handle(ReturnCommand::Enqueue(user("a")));

        poller.settle_all().await;

        assert_eq!(queued(&poller), vec!["a"]);
    }
}
