// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use batchdesk_core::application::ShutdownToken;
use batchdesk_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pool sizing and timing, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
    pub health_check_period: Duration,
    pub connect_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 4,
            min_connections: 0,
            max_lifetime: Duration::from_secs(3600),
            idle_timeout: Duration::from_secs(1800),
            health_check_period: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Create SQLite connection pool with WAL mode and foreign keys on
///
/// Connections are pinged before being handed out; acquire and release are
/// logged at debug.
pub async fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Config(format!("Invalid database url {}: {}", database_url, e)))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .max_lifetime(Some(settings.max_lifetime))
        .idle_timeout(Some(settings.idle_timeout))
        .acquire_timeout(settings.connect_timeout)
        .test_before_acquire(true)
        .before_acquire(|_conn, meta| {
            Box::pin(async move {
                debug!(
                    age_ms = meta.age.as_millis() as u64,
                    idle_ms = meta.idle_for.as_millis() as u64,
                    "Acquiring pooled connection"
                );
                Ok(true)
            })
        })
        .after_release(|_conn, meta| {
            Box::pin(async move {
                debug!(age_ms = meta.age.as_millis() as u64, "Connection released");
                Ok(true)
            })
        })
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    info!(
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        "Database pool ready"
    );
    Ok(pool)
}

/// Ping one pooled connection every `period` until shutdown or pool close
pub fn spawn_health_check(
    pool: SqlitePool,
    period: Duration,
    mut shutdown: ShutdownToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick fires immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.wait() => break,
            }
            if pool.is_closed() {
                break;
            }
            match sqlx::query("select 1").execute(&pool).await {
                Ok(_) => debug!(
                    size = pool.size(),
                    idle = pool.num_idle(),
                    "Database health check ok"
                ),
                Err(e) => warn!(error = %e, "Database health check failed"),
            }
        }
        debug!("Database health check stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchdesk_core::application::shutdown_channel;

    #[tokio::test]
    async fn test_create_pool() {
        let pool = create_pool("sqlite::memory:", &PoolSettings::default())
            .await
            .unwrap();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_pool_fails_acquisition() {
        let pool = create_pool("sqlite::memory:", &PoolSettings::default())
            .await
            .unwrap();
        pool.close().await;
        let err = pool.acquire().await.err().map(map_sqlx_error);
        assert!(matches!(err, Some(AppError::Acquisition(_))));
    }

    #[tokio::test]
    async fn test_health_check_stops_on_shutdown() {
        let pool = create_pool("sqlite::memory:", &PoolSettings::default())
            .await
            .unwrap();
        let (sender, token) = shutdown_channel();
        let handle = spawn_health_check(pool, Duration::from_millis(10), token);

        tokio::time::sleep(Duration::from_millis(30)).await;
        sender.shutdown();
        assert!(tokio::time::timeout(Duration::from_secs(1), handle).await.is_ok());
    }
}
