// Batch Service - header + N child items, sync and async variants

pub mod fill;

pub use fill::{fill_async, FillOutcome};

use crate::application::worker::{BatchQueue, BatchTask};
use crate::domain::{validate_quantity, Job, JobId, JobKind, JobStatus};
use crate::error::{AppError, Result};
use crate::port::{BatchStore, TimeProvider, Transaction};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Batch Service
pub struct BatchService {
    store: Arc<dyn BatchStore>,
    queue: BatchQueue,
    time_provider: Arc<dyn TimeProvider>,
}

impl BatchService {
    pub fn new(
        store: Arc<dyn BatchStore>,
        queue: BatchQueue,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            queue,
            time_provider,
        }
    }

    /// Insert a batch of `quantity` items inside a single transaction.
    ///
    /// A failing child insert is logged and skipped; the job still ends
    /// Finished. Returns the re-listed job with its items.
    pub async fn insert_sync(&self, quantity: i64) -> Result<Job> {
        validate_quantity(quantity)?;

        let mut tx = self.store.begin().await?;
        let mut job = tx
            .insert_job(JobKind::Sync, quantity, self.time_provider.now_secs())
            .await?;

        let mut failed = 0_i64;
        for position in 1..=quantity {
            if let Err(e) = tx.insert_item(job.id, position).await {
                failed += 1;
                error!(job_id = job.id, position, error = %e, "Error inserting one item");
            }
        }
        if failed > 0 {
            warn!(
                job_id = job.id,
                failed,
                quantity,
                "Sync batch finished with missing items"
            );
        }

        let now = self.time_provider.now_secs();
        job.finish(now)?;
        tx.update_status(job.id, JobStatus::Finished, now).await?;
        tx.commit().await?;

        info!(job_id = job.id, quantity, "Sync batch finished");

        self.list_job(job.id).await?.ok_or_else(|| {
            AppError::Internal(format!("Batch {} vanished after commit", job.id))
        })
    }

    /// Insert and commit the header, then hand child population to the
    /// worker pool. The returned job is still Running; there is no handle
    /// to wait on.
    pub async fn insert_async(&self, quantity: i64) -> Result<Job> {
        validate_quantity(quantity)?;

        // Reserve queue capacity first so a full queue never leaves a
        // committed header without a worker
        let slot = self.queue.reserve().await?;

        let mut tx = self.store.begin().await?;
        let job = tx
            .insert_job(JobKind::Async, quantity, self.time_provider.now_secs())
            .await?;
        tx.commit().await?;

        slot.submit(BatchTask { job: job.clone() });
        info!(job_id = job.id, quantity, "Async batch submitted");
        Ok(job)
    }

    /// Header plus items ordered by position; `None` when the header is absent
    pub async fn list_job(&self, id: JobId) -> Result<Option<Job>> {
        let mut job = match self.store.find_job(id).await? {
            Some(job) => job,
            None => return Ok(None),
        };

        match self.store.find_items(job.id).await {
            Ok(items) => job.items = items,
            Err(e) => {
                warn!(job_id = job.id, error = %e, "Cannot load batch items, returning header only");
            }
        }
        Ok(Some(job))
    }

    /// Delete every item and every header
    pub async fn clear_all(&self) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.clear_all().await?;
        tx.commit().await?;
        info!("All batches cleared");
        Ok(())
    }
}
