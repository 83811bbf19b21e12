// Transaction scope: one connection, rolled back on drop unless closed

use crate::error::map_tx_error;
use async_trait::async_trait;
use batchdesk_core::error::{AppError, Result};
use batchdesk_core::port::Transaction;
use sqlx::{Sqlite, SqliteConnection};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Open transaction handed out by `SqliteExecutor::begin`
///
/// Commit and rollback close the scope; calling either again is a logged
/// no-op. Dropping an open scope rolls it back.
pub struct TxScope {
    id: u64,
    tx: Option<sqlx::Transaction<'static, Sqlite>>,
}

impl TxScope {
    pub(crate) fn new(tx: sqlx::Transaction<'static, Sqlite>) -> Self {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(scope = id, "Transaction started");
        Self { id, tx: Some(tx) }
    }

    pub fn is_open(&self) -> bool {
        self.tx.is_some()
    }

    pub(crate) fn connection(&mut self) -> Result<&mut SqliteConnection> {
        let id = self.id;
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::Transaction(format!("Transaction {} already closed", id)))
    }

    pub async fn commit(&mut self) -> Result<()> {
        match self.tx.take() {
            None => {
                debug!(scope = self.id, "Commit on closed transaction ignored");
                Ok(())
            }
            Some(tx) => {
                tx.commit().await.map_err(|e| {
                    error!(scope = self.id, error = %e, "Commit failed");
                    map_tx_error(e)
                })?;
                debug!(scope = self.id, "Transaction committed");
                Ok(())
            }
        }
    }

    pub async fn rollback(&mut self) -> Result<()> {
        match self.tx.take() {
            None => {
                debug!(scope = self.id, "Rollback on closed transaction ignored");
                Ok(())
            }
            Some(tx) => {
                tx.rollback().await.map_err(|e| {
                    error!(scope = self.id, error = %e, "Rollback failed");
                    map_tx_error(e)
                })?;
                debug!(scope = self.id, "Transaction rolled back");
                Ok(())
            }
        }
    }
}

impl Drop for TxScope {
    fn drop(&mut self) {
        // sqlx queues the ROLLBACK when the inner transaction drops
        if self.tx.is_some() {
            warn!(scope = self.id, "Transaction dropped while open, rolling back");
        }
    }
}

#[async_trait]
impl Transaction for TxScope {
    async fn commit(&mut self) -> Result<()> {
        TxScope::commit(self).await
    }

    async fn rollback(&mut self) -> Result<()> {
        TxScope::rollback(self).await
    }
}
