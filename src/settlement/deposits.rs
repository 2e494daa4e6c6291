// Deposit polling loop - owns the user registry.
//
// Reacts to two things only: its own interval tick, on which every
// registered deposit address is checked and swept, and registration
// commands arriving on its inbox. Nothing else touches the registry.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::error::RegistrationError;
use crate::mixer::{DepositSweeper, User, UserRegistry};
use crate::settlement::returns::ReturnCommand;
use crate::settlement::scheduler::polling_interval;

/// Messages accepted by the deposit polling task
#[derive(Debug)]
pub enum DepositCommand {
    /// Check the addresses against the registry and, if free, register a new user
    Register {
        return_addresses: Vec<String>,
        reply: oneshot::Sender<Result<User, RegistrationError>>,
    },
    CountUsers {
        reply: oneshot::Sender<usize>,
    },
}

pub struct DepositPoller {
    sweeper: DepositSweeper,
    registry: UserRegistry,
    inbox: mpsc::UnboundedReceiver<DepositCommand>,
    house_queue: mpsc::UnboundedSender<ReturnCommand>,
    interval: Duration,
}

impl DepositPoller {
    pub fn new(
        sweeper: DepositSweeper,
        inbox: mpsc::UnboundedReceiver<DepositCommand>,
        house_queue: mpsc::UnboundedSender<ReturnCommand>,
        interval: Duration,
    ) -> Self {
        Self {
            sweeper,
            registry: UserRegistry::new(),
            inbox,
            house_queue,
            interval,
        }
    }

    pub async fn run(mut self) {
        let mut ticker = polling_interval(self.interval);
        info!("🔄 Deposit polling started (every {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_all().await;
                }
                command = self.inbox.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        info!("Registration inbox closed, deposit polling stopped");
                        break;
                    }
                },
            }
        }
    }

    /// Sweep every registered user once, in registration order.
    /// Returns how many deposits were moved to the house.
    async fn sweep_all(&mut self) -> usize {
        let mut swept_count = 0;

        for user in self.registry.users() {
            match self.sweeper.sweep(user).await {
                Ok(true) => {
                    swept_count += 1;
                    if self
                        .house_queue
                        .send(ReturnCommand::Enqueue(user.clone()))
                        .is_err()
                    {
                        error!(
                            "❌ Return polling is gone; {} was swept but cannot be queued",
                            user.deposit_address
                        );
                    }
                }
                Ok(false) => {}
                Err(e) => warn!("Sweep of {} failed: {}", user.deposit_address, e),
            }
        }

        if swept_count > 0 {
            info!(
                "✓ Deposit cycle swept {} of {} users",
                swept_count,
                self.registry.len()
            );
        }
        swept_count
    }

    fn handle(&mut self, command: DepositCommand) {
        match command {
            DepositCommand::Register {
                return_addresses,
                reply,
            } => {
                let outcome = self.registry.register(return_addresses);
                if let Err(e) = &outcome {
                    info!("Registration rejected: {}", e);
                }
                // The caller may have given up waiting; the user stays registered.
                let _ = reply.send(outcome);
            }
            DepositCommand::CountUsers { reply } => {
                let _ = reply.send(self.registry.len());
            }
        }
    }
}
