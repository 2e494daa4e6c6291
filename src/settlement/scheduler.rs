// Mixer scheduler - wires the two polling loops together and hands out the
// only way to talk to them.
//
// Each loop runs on its own interval so the sweep and payout cadences can be
// tuned independently. The deposit loop feeds swept users to the return loop
// over an unbounded channel; that is the only link between them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::gateway::LedgerGateway;
use crate::mixer::{DepositSweeper, DistributionConfig, DistributionPlanner, ReturnScheduler, User};
use crate::settlement::deposits::{DepositCommand, DepositPoller};
use crate::settlement::returns::{ReturnCommand, ReturnPoller};

/// How long a status query waits for a busy loop before giving up
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub sweep_interval: Duration,
    pub settlement_interval: Duration,
}

/// Interval whose first tick fires one full period from now. A cycle that
/// overruns delays the next tick rather than bursting to catch up.
pub(crate) fn polling_interval(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Cloneable front door to the running loops
#[derive(Clone)]
pub struct MixerHandle {
    deposits: mpsc::UnboundedSender<DepositCommand>,
    returns: mpsc::UnboundedSender<ReturnCommand>,
}

impl MixerHandle {
    /// Register a user through the deposit loop, which owns the registry.
    /// Waits for as long as the loop is busy with a sweep cycle.
    pub async fn register(&self, return_addresses: Vec<String>) -> AppResult<User> {
        let (reply, response) = oneshot::channel();
        self.deposits
            .send(DepositCommand::Register {
                return_addresses,
                reply,
            })
            .map_err(|_| AppError::Unavailable("deposit polling is not running".to_string()))?;

        let outcome = response
            .await
            .map_err(|_| AppError::Unavailable("deposit polling dropped the request".to_string()))?;
        Ok(outcome?)
    }

    pub async fn registered_users(&self) -> AppResult<usize> {
        let (reply, response) = oneshot::channel();
        self.deposits
            .send(DepositCommand::CountUsers { reply })
            .map_err(|_| AppError::Unavailable("deposit polling is not running".to_string()))?;
        await_reply(response).await
    }

    pub async fn queued_payouts(&self) -> AppResult<usize> {
        let (reply, response) = oneshot::channel();
        self.returns
            .send(ReturnCommand::CountQueued { reply })
            .map_err(|_| AppError::Unavailable("return polling is not running".to_string()))?;
        await_reply(response).await
    }
}

async fn await_reply<T>(response: oneshot::Receiver<T>) -> AppResult<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, response).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err(AppError::Unavailable("polling task dropped the request".to_string())),
        Err(_) => Err(AppError::Unavailable("polling task is busy".to_string())),
    }
}

/// Join handles of the two background loops
pub struct MixerTasks {
    pub deposits: JoinHandle<()>,
    pub returns: JoinHandle<()>,
}

impl MixerTasks {
    pub fn abort(&self) {
        self.deposits.abort();
        self.returns.abort();
    }
}

pub struct MixerScheduler {
    config: ScheduleConfig,
    distribution: DistributionConfig,
    ledger: Arc<dyn LedgerGateway>,
    house_address: String,
}

impl MixerScheduler {
    pub fn new(
        config: ScheduleConfig,
        distribution: DistributionConfig,
        ledger: Arc<dyn LedgerGateway>,
        house_address: String,
    ) -> Self {
        Self {
            config,
            distribution,
            ledger,
            house_address,
        }
    }

    /// Spawn both loops (runs in background for the process lifetime)
    pub fn start(self) -> (MixerHandle, MixerTasks) {
        let (deposit_tx, deposit_rx) = mpsc::unbounded_channel();
        let (return_tx, return_rx) = mpsc::unbounded_channel();

        let sweeper = DepositSweeper::new(self.ledger.clone(), self.house_address.clone());
        let deposit_poller = DepositPoller::new(
            sweeper,
            deposit_rx,
            return_tx.clone(),
            self.config.sweep_interval,
        );

        let scheduler = ReturnScheduler::new(
            self.ledger,
            DistributionPlanner::new(self.distribution),
            self.house_address,
        );
        let return_poller = ReturnPoller::new(scheduler, return_rx, self.config.settlement_interval);

        let tasks = MixerTasks {
            deposits: tokio::spawn(deposit_poller.run()),
            returns: tokio::spawn(return_poller.run()),
        };
        info!(
            "✅ Mixer loops started (sweep every {:?}, returns every {:?})",
            self.config.sweep_interval, self.config.settlement_interval
        );

        let handle = MixerHandle {
            deposits: deposit_tx,
            returns: return_tx,
        };
        (handle, tasks)
    }
}
