use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api::handler::AppState,
    config::{LedgerBackend, MixerConfig},
    gateway::{InMemoryLedger, JobcoinClient, LedgerGateway},
    middleware::RateLimitLayer,
    mixer::DistributionConfig,
    settlement::{MixerScheduler, MixerTasks, ScheduleConfig},
};

/// Everything `main` needs to serve requests and later stop the loops
pub struct Application {
    pub state: AppState,
    pub registration_limit: RateLimitLayer,
    pub tasks: MixerTasks,
}

pub async fn initialize_app_state(config: &MixerConfig) -> anyhow::Result<Application> {
    info!("Initializing application components ...");

    let (ledger, faucet): (Arc<dyn LedgerGateway>, Option<Arc<InMemoryLedger>>) =
        match config.ledger_backend {
            LedgerBackend::Jobcoin => {
                let client = JobcoinClient::new(&config.jobcoin_api_url, config.ledger_timeout)
                    .context("failed to build Jobcoin client")?;
                info!("✅ Jobcoin ledger client ready at {}", config.jobcoin_api_url);
                (Arc::new(client) as Arc<dyn LedgerGateway>, None)
            }
            LedgerBackend::Memory => {
                let ledger = Arc::new(InMemoryLedger::new());
                warn!("⚠️  Using in-memory ledger - balances are lost on restart");
                (ledger.clone() as Arc<dyn LedgerGateway>, Some(ledger))
            }
        };

    let house_address = match &config.house_address {
        Some(address) => address.clone(),
        None => {
            let address = Uuid::new_v4().to_string();
            warn!("⚠️  HOUSE_ADDRESS not set - using fresh address {}", address);
            address
        }
    };
    info!("🏠 House address: {}", house_address);

    let scheduler = MixerScheduler::new(
        ScheduleConfig {
            sweep_interval: config.sweep_interval,
            settlement_interval: config.settlement_interval,
        },
        DistributionConfig {
            increment: config.distribution_increment,
            epsilon: config.distribution_epsilon,
        },
        ledger,
        house_address.clone(),
    );
    let (mixer, tasks) = scheduler.start();

    let state = AppState {
        mixer,
        house_address,
        faucet,
    };

    info!("✓ Application state initialized");
    Ok(Application {
        state,
        registration_limit: RateLimitLayer::per_minute(config.registration_rate_limit),
        tasks,
    })
}
