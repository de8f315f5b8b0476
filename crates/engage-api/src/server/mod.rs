//! Server setup and initialization
//!
//! Builds the stores selected by configuration, wires the engagement service,
//! runs the background reconciler and serves HTTP until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use engage_cache::{RedisCounterStore, RedisPool};
use engage_common::{AppConfig, AppError, CounterBackend, StorageBackend};
use engage_core::traits::{CatalogStore, CounterStore, LikeLedgerStore};
use engage_db::{
    create_pool, ensure_schema, MemoryCatalog, MemoryCounterStore, MemoryLikeLedger,
    PgCatalogStore, PgCounterStore, PgLikeLedger, PgPool,
};
use engage_service::{EngagementService, EngineSettings, ServiceContextBuilder};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::middleware::apply_middleware;
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Storage ports selected by configuration
struct Stores {
    ledger: Arc<dyn LikeLedgerStore>,
    counter: Arc<dyn CounterStore>,
    catalog: Arc<dyn CatalogStore>,
}

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Result<Router, AppError> {
    let config = state.config();
    let api = apply_middleware(
        create_router(),
        &config.rate_limit,
        &config.cors,
        config.app.env.is_production(),
    )?;

    Ok(Router::new()
        .merge(health_routes())
        .merge(api)
        .with_state(state))
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    let stores = build_stores(&config).await?;

    let service_context = ServiceContextBuilder::new()
        .ledger_store(stores.ledger)
        .counter_store(stores.counter)
        .catalog(stores.catalog)
        .resilience(config.resilience.clone())
        .settings(EngineSettings::from_config(&config))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let engagement = EngagementService::new(service_context);

    // A cold cache is rebuilt on the first listing request
    match engagement.rebuild_cache().await {
        Ok(summary) => info!(entries = summary.entries, "Ranking cache warmed"),
        Err(e) => warn!(error = %e, "Initial ranking cache build failed"),
    }

    Ok(AppState::new(engagement, config))
}

async fn build_stores(config: &AppConfig) -> Result<Stores, AppError> {
    let pool = if config.storage.needs_postgres() {
        Some(connect_postgres(config).await?)
    } else {
        None
    };
    let require_pool = || {
        pool.clone()
            .ok_or_else(|| AppError::Config("DATABASE_URL is required".to_string()))
    };

    let ledger: Arc<dyn LikeLedgerStore>;
    let catalog: Arc<dyn CatalogStore>;
    match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = require_pool()?;
            ledger = Arc::new(PgLikeLedger::new(pool.clone()));
            catalog = Arc::new(PgCatalogStore::new(pool));
        }
        StorageBackend::Memory => {
            let seeded = MemoryCatalog::seeded(config.storage.seed_products)?;
            info!(products = seeded.product_count(), "Using in-memory ledger and catalog");
            ledger = Arc::new(MemoryLikeLedger::new());
            catalog = Arc::new(seeded);
        }
    }

    let counter: Arc<dyn CounterStore> = match config.storage.counter {
        CounterBackend::Postgres => Arc::new(PgCounterStore::new(require_pool()?)),
        CounterBackend::Redis => {
            let redis = config
                .redis
                .as_ref()
                .ok_or_else(|| AppError::Config("REDIS_URL is required".to_string()))?;
            info!("Connecting to Redis...");
            let redis_pool =
                RedisPool::from_config(redis).map_err(|e| AppError::Cache(e.to_string()))?;
            info!("Redis pool created");
            Arc::new(RedisCounterStore::new(redis_pool))
        }
        CounterBackend::Memory => Arc::new(MemoryCounterStore::new()),
    };

    Ok(Stores {
        ledger,
        counter,
        catalog,
    })
}

async fn connect_postgres(config: &AppConfig) -> Result<PgPool, AppError> {
    let database = config
        .database
        .as_ref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is required".to_string()))?;

    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&engage_db::DatabaseConfig::from(database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    ensure_schema(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    Ok(pool)
}

/// Serve on an already bound listener until `shutdown` resolves
///
/// The reconciler runs alongside the server and is stopped once the server
/// has drained.
pub async fn serve(
    state: AppState,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let reconciler = state.engagement().reconciler().spawn(stop_rx);

    let app = create_app(state)?;

    if let Ok(addr) = listener.local_addr() {
        info!("Server listening on http://{}", addr);
    }

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")));

    // Receiver may already be gone if the task exited early
    let _ = stop_tx.send(true);
    if let Err(e) = reconciler.await {
        warn!(error = %e, "Reconciler task ended abnormally");
    }
    info!("Server stopped");

    served
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .api
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid bind address: {e}")))?;

    let state = create_app_state(config).await?;

    info!("Starting HTTP server on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    serve(state, listener, shutdown_signal()).await
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
