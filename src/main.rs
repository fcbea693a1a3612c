//! atomic_ledger - account ledger HTTP service
//!
//! Serves account creation, lookup and atomic transfers over either the
//! PostgreSQL store or the in-process memory store.

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atomic_ledger::api::{self, ApiKeyDigest};
use atomic_ledger::config::StoreBackend;
use atomic_ledger::store::LedgerStore;
use atomic_ledger::{db, Config, Ledger, MemoryLedgerStore, PgLedgerStore};

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "atomic_ledger=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;
    init_tracing(config.is_production());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        backend = ?config.store_backend,
        environment = %config.environment,
        "Starting atomic_ledger server"
    );

    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres backend"))?;

            tracing::info!("Connecting to database...");
            let pool = db::connect(database_url, &config.pool).await?;
            db::verify_connection(&pool).await?;
            db::ensure_schema(&pool).await?;

            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }
            tracing::info!("Database connected successfully");

            serve(&config, addr, PgLedgerStore::new(pool.clone())).await?;

            pool.close().await;
            tracing::info!("Database connections closed. Goodbye!");
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; balances are lost on shutdown");
            serve(&config, addr, MemoryLedgerStore::new()).await?;
        }
    }

    Ok(())
}

/// Build the ledger over `store` and serve HTTP until a shutdown signal
async fn serve<S: LedgerStore>(config: &Config, addr: SocketAddr, store: S) -> anyhow::Result<()> {
    let ledger = Ledger::new(store)
        .with_retry_policy(config.retry)
        .with_default_deadline(config.transfer_timeout);

    let app = api::build_router(ledger, ApiKeyDigest::new(config.api_key_hash));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
