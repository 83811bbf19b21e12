// Background fill of an async batch (runs on a worker, never on the request path)

use crate::domain::{Job, JobStatus};
use crate::port::{BatchStore, TimeProvider, Transaction};
use tracing::{error, info, warn};

/// How a background fill ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// All items inserted, job committed as Finished
    Finished,
    /// A child insert failed at `position`; `recorded` tells whether the
    /// compensating transaction managed to commit status Error
    Failed { position: i64, recorded: bool },
    /// No transaction could be opened or the final commit failed. The job is
    /// left as the store has it, possibly still Running.
    Abandoned,
}

/// Insert children 1..=quantity for an already committed header, then
/// finalize it.
///
/// The first failing child aborts the loop: the in-flight transaction is
/// rolled back and a compensating transaction marks the job Error.
pub async fn fill_async(store: &dyn BatchStore, time: &dyn TimeProvider, mut job: Job) -> FillOutcome {
    let mut tx = match store.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            error!(job_id = job.id, error = %e, "Cannot start transaction for async batch");
            return FillOutcome::Abandoned;
        }
    };

    for position in 1..=job.quantity {
        if let Err(e) = tx.insert_item(job.id, position).await {
            error!(job_id = job.id, position, error = %e, "Error inserting one item, compensating");
            if let Err(e) = tx.rollback().await {
                warn!(job_id = job.id, error = %e, "Rollback of failed batch transaction failed");
            }
            // Release the connection before the compensating transaction asks for one
            drop(tx);
            let recorded = compensate(store, time, &mut job).await;
            return FillOutcome::Failed { position, recorded };
        }
    }

    let now = time.now_secs();
    if let Err(e) = job.finish(now) {
        error!(job_id = job.id, error = %e, "Cannot finish async batch");
        return FillOutcome::Abandoned;
    }
    if let Err(e) = tx.update_status(job.id, JobStatus::Finished, now).await {
        error!(job_id = job.id, error = %e, "Error updating batch status, job left Running");
        return FillOutcome::Abandoned;
    }
    if let Err(e) = tx.commit().await {
        error!(job_id = job.id, error = %e, "Error committing async batch, job left Running");
        return FillOutcome::Abandoned;
    }

    info!(job_id = job.id, quantity = job.quantity, "Async batch finished");
    FillOutcome::Finished
}

/// Record status Error in a fresh transaction
async fn compensate(store: &dyn BatchStore, time: &dyn TimeProvider, job: &mut Job) -> bool {
    let mut tx = match store.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            error!(job_id = job.id, error = %e, "Cannot start compensating transaction");
            return false;
        }
    };

    let now = time.now_secs();
    if let Err(e) = job.fail(now) {
        error!(job_id = job.id, error = %e, "Cannot mark batch as failed");
        return false;
    }
    match tx.update_status(job.id, JobStatus::Error, now).await {
        Ok(1) => {}
        Ok(affected) => {
            error!(job_id = job.id, affected, "Batch status to Error did not match exactly one job");
            return false;
        }
        Err(e) => {
            error!(job_id = job.id, error = %e, "Error updating batch status to Error");
            return false;
        }
    }
    match tx.commit().await {
        Ok(()) => true,
        Err(e) => {
            error!(job_id = job.id, error = %e, "Error committing compensating transaction");
            false
        }
    }
}
