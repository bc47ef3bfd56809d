//! Process bootstrap shared by the admin and frontend binaries

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{net::SocketAddr, sync::Arc};
use tokio::{sync::watch, task::JoinHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::{AppConfig, DatabaseConfig, LoggingConfig, ServiceRole},
    events::{redis::RedisBroker, EventPublisher, Topic},
    repository::{AdminStore, FrontendStore, PgAdminStore, PgFrontendStore},
    services::{AdminServices, FrontendServices},
    sweeper::{self, DueDateSweeper},
    sync::{AdminHandler, FrontendHandler, InboundHandler, Reconciler},
    AppState,
};

/// Initialize tracing: `RUST_LOG` wins over the configured level
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("library_services={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

pub async fn connect_database(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect(&config.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");
    Ok(pool)
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Consumer name inside the service's group. It must survive restarts so
/// that unacknowledged entries are picked up again by the next process.
fn consumer_name(config: &AppConfig, role: ServiceRole) -> String {
    config
        .broker
        .consumer
        .clone()
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()))
        .unwrap_or_else(|| format!("{}-1", role))
}

async fn start_reconciler(
    role: ServiceRole,
    config: &AppConfig,
    broker: &RedisBroker,
    handler: Arc<dyn InboundHandler>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<JoinHandle<()>> {
    let consumer = consumer_name(config, role);
    let subscription = broker
        .subscribe(Topic::inbound(role), &config.broker.group, &consumer, config.broker.batch_size)
        .await
        .context("Failed to subscribe to inbound topics")?;
    tracing::info!("Joined consumer group {} as {}", config.broker.group, consumer);

    let reconciler = Reconciler::new(
        role,
        Arc::new(subscription),
        handler,
        config.sync.poll_interval(),
        config.sync.poll_timeout(),
    );
    Ok(tokio::spawn(reconciler.run(shutdown)))
}

/// Serve `app` until a shutdown signal, then stop the background tasks and
/// wait for them to drain
async fn serve(
    config: &AppConfig,
    app: axum::Router,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!("Background task ended abnormally: {}", e);
        }
    }
    Ok(())
}

/// Run the admin service: inventory API, reconciler and due-date sweeper
pub async fn run_admin(config: AppConfig) -> anyhow::Result<()> {
    let role = ServiceRole::Admin;
    let schedule = sweeper::parse_crontab(&config.sweeper.crontab)?;

    let pool = connect_database(&config.database).await?;
    sqlx::migrate!("./migrations/admin")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations completed");

    let broker = RedisBroker::connect(&config.broker, config.topics.clone())
        .await
        .context("Failed to connect to Redis")?;
    tracing::info!("Connected to Redis");

    let store: Arc<dyn AdminStore> = Arc::new(PgAdminStore::new(pool.clone()));
    let events: Arc<dyn EventPublisher> = Arc::new(broker.clone());
    let services = AdminServices::new(store, events);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = start_reconciler(
        role,
        &config,
        &broker,
        Arc::new(AdminHandler::new(services.clone())),
        shutdown_rx.clone(),
    )
    .await?;
    let sweeper = DueDateSweeper::new(services.inventory.clone(), schedule);
    let sweeper = tokio::spawn(sweeper.run(shutdown_rx));

    let config = Arc::new(config);
    let app = api::create_admin_router(AppState::new(config.clone(), services));
    serve(&config, app, shutdown_tx, vec![reconciler, sweeper]).await?;

    pool.close().await;
    tracing::info!("Admin service stopped");
    Ok(())
}

/// Run the frontend service: catalog API and reconciler
pub async fn run_frontend(config: AppConfig) -> anyhow::Result<()> {
    let role = ServiceRole::Frontend;

    let pool = connect_database(&config.database).await?;
    sqlx::migrate!("./migrations/frontend")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations completed");

    let broker = RedisBroker::connect(&config.broker, config.topics.clone())
        .await
        .context("Failed to connect to Redis")?;
    tracing::info!("Connected to Redis");

    let store: Arc<dyn FrontendStore> = Arc::new(PgFrontendStore::new(pool.clone()));
    let events: Arc<dyn EventPublisher> = Arc::new(broker.clone());
    let services = FrontendServices::new(store, events);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = start_reconciler(
        role,
        &config,
        &broker,
        Arc::new(FrontendHandler::new(services.clone())),
        shutdown_rx,
    )
    .await?;

    let config = Arc::new(config);
    let app = api::create_frontend_router(AppState::new(config.clone(), services));
    serve(&config, app, shutdown_tx, vec![reconciler]).await?;

    pool.close().await;
    tracing::info!("Frontend service stopped");
    Ok(())
}
