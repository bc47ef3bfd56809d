//! Frontend service: public catalog, borrowing and user sign-up

use anyhow::Context;
use library_services::{server, AppConfig, ServiceRole};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load(ServiceRole::Frontend).context("Failed to load configuration")?;
    server::init_tracing(&config.logging);

    tracing::info!("Starting library frontend service v{}", env!("CARGO_PKG_VERSION"));
    server::run_frontend(config).await
}
