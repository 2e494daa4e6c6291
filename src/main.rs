mod api;
mod bootstrap;
mod config;
mod error;
mod gateway;
mod middleware;
mod mixer;
mod server;
mod settlement;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::MixerConfig;

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,mixer=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting coin mixer");

    let config = MixerConfig::from_env().context("invalid configuration")?;

    let app = bootstrap::initialize_app_state(&config).await?;

    let router = server::create_app(app.state, app.registration_limit).await;
    let outcome = server::run_server(router, &config.bind_address).await;

    app.tasks.abort();
    info!("👋 Mixer stopped");
    outcome
}
