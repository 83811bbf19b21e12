//! Batchdesk - Main Entry Point

mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use batchdesk_api_rpc::{JwtTokenIssuer, RpcHandler, RpcServer};
use batchdesk_core::application::worker::constants::SHUTDOWN_DRAIN_TIMEOUT;
use batchdesk_core::application::{
    shutdown_channel, AccountService, AuthService, BatchService, BatchWorkerPool,
};
use batchdesk_core::port::time_provider::SystemTimeProvider;
use batchdesk_core::port::{AccountStore, BatchStore, TimeProvider, TokenIssuer};
use batchdesk_infra_sqlite::{
    create_pool, run_migrations, spawn_health_check, SqliteAccountStore, SqliteBatchStore,
    SqliteExecutor,
};
use settings::{DaemonConfig, LogFormat};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("batchdesk=info"))
        .context("Failed to create env filter")?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::load()?;
    init_logging(config.log_format)?;

    info!("Batchdesk v{} starting...", VERSION);

    // 2. Database
    let database_url = config.database_url();
    if let Some(dir) = config.database_dir() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }
    info!(database_url = %database_url, "Initializing database...");

    let pool_settings = config.pool.settings();
    let pool = create_pool(&database_url, &pool_settings)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. DI wiring
    let executor = SqliteExecutor::new(pool.clone());
    let batch_store: Arc<dyn BatchStore> = Arc::new(SqliteBatchStore::new(executor.clone()));
    let account_store: Arc<dyn AccountStore> = Arc::new(SqliteAccountStore::new(executor));
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);

    let (jwt_secret, is_dev_secret) = config.jwt_secret();
    if is_dev_secret {
        warn!("auth.jwt_secret is not set, using the development secret");
    }
    let token_issuer: Arc<dyn TokenIssuer> = Arc::new(JwtTokenIssuer::new(&jwt_secret));

    let accounts = Arc::new(AccountService::new(Arc::clone(&account_store)));
    if let (Some(email), Some(password)) = (
        config.auth.admin_email.as_deref(),
        config.auth.admin_password.as_deref(),
    ) {
        accounts
            .ensure_admin(email, password)
            .await
            .context("Bootstrap admin account failed")?;
    }

    // 4. Batch workers
    let (worker_pool, queue) = BatchWorkerPool::start(
        config.batch.workers,
        config.batch.queue_capacity,
        Arc::clone(&batch_store),
        Arc::clone(&time_provider),
    );

    let batch = Arc::new(BatchService::new(batch_store, queue, Arc::clone(&time_provider)));
    let auth = Arc::new(AuthService::new(account_store, token_issuer, time_provider));

    // 5. JSON-RPC server
    let rpc_server = RpcServer::new(config.rpc_server(), RpcHandler::new(batch, accounts, auth));
    let (rpc_handle, rpc_addr) = rpc_server
        .start()
        .await
        .context("RPC server start failed")?;

    // 6. Pool health check
    let (health_tx, health_rx) = shutdown_channel();
    let health_handle = spawn_health_check(pool.clone(), pool_settings.health_check_period, health_rx);

    info!(addr = %rpc_addr, "System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown: transport, then workers, then the pool
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    rpc_handle.stopped().await;

    worker_pool.shutdown(SHUTDOWN_DRAIN_TIMEOUT).await;

    health_tx.shutdown();
    if let Err(e) = health_handle.await {
        warn!(error = %e, "Health check task ended abnormally");
    }
    pool.close().await;

    info!("Shutdown complete.");

    Ok(())
}
