//! Admin service: book inventory, borrow records and the due-date sweeper

use anyhow::Context;
use library_services::{server, AppConfig, ServiceRole};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load(ServiceRole::Admin).context("Failed to load configuration")?;
    server::init_tracing(&config.logging);

    tracing::info!("Starting library admin service v{}", env!("CARGO_PKG_VERSION"));
    server::run_admin(config).await
}
