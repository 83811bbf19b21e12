// SQLite BatchStore Implementation

use crate::executor::SqliteExecutor;
use crate::query::{self, ValueSet};
use crate::rows::{JOBS, JOB_ITEMS};
use crate::transaction::TxScope;
use async_trait::async_trait;
use batchdesk_core::domain::{ChildItem, Job, JobId, JobKind, JobStatus};
use batchdesk_core::error::Result;
use batchdesk_core::port::{BatchStore, BatchTransaction, Transaction};
use tracing::debug;

pub struct SqliteBatchStore {
    executor: SqliteExecutor,
}

impl SqliteBatchStore {
    pub fn new(executor: SqliteExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl BatchStore for SqliteBatchStore {
    async fn begin(&self) -> Result<Box<dyn BatchTransaction>> {
        let scope = self.executor.begin().await?;
        Ok(Box::new(SqliteBatchTransaction {
            executor: self.executor.clone(),
            scope,
        }))
    }

    async fn find_job(&self, id: JobId) -> Result<Option<Job>> {
        self.executor.find(None, id).await
    }

    async fn find_items(&self, job_id: JobId) -> Result<Vec<ChildItem>> {
        let statement = query::select(
            format!("{} where job_id = $1 order by position", JOB_ITEMS.select_all()),
            &ValueSet::new().with("job_id", job_id),
        );
        self.executor.query_all(None, &statement).await
    }
}

pub struct SqliteBatchTransaction {
    executor: SqliteExecutor,
    scope: TxScope,
}

#[async_trait]
impl Transaction for SqliteBatchTransaction {
    async fn commit(&mut self) -> Result<()> {
        self.scope.commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.scope.rollback().await
    }
}

#[async_trait]
impl BatchTransaction for SqliteBatchTransaction {
    async fn insert_job(&mut self, kind: JobKind, quantity: i64, started_at: i64) -> Result<Job> {
        let values = ValueSet::new()
            .with("kind", kind)
            .with("quantity", quantity)
            .with("status", JobStatus::Running)
            .with("started_at", started_at);
        let job: Job = self.executor.insert_returning(&mut self.scope, &values).await?;
        debug!(job_id = job.id, %kind, quantity, "Batch header inserted");
        Ok(job)
    }

    async fn insert_item(&mut self, job_id: JobId, position: i64) -> Result<()> {
        let values = ValueSet::new()
            .with("job_id", job_id)
            .with("position", position);
        self.executor
            .execute(&mut self.scope, &query::insert(JOB_ITEMS.table, &values))
            .await?;
        Ok(())
    }

    async fn update_status(&mut self, job_id: JobId, status: JobStatus, ended_at: i64) -> Result<u64> {
        let params = ValueSet::new()
            .with("status", status)
            .with("ended_at", ended_at);
        let filters = ValueSet::new().with(JOBS.primary_key, job_id);
        self.executor
            .execute(&mut self.scope, &query::update(JOBS.table, &params, &filters))
            .await
    }

    async fn clear_all(&mut self) -> Result<()> {
        let items = self
            .executor
            .execute(&mut self.scope, &query::delete(JOB_ITEMS.table, &ValueSet::new()))
            .await?;
        let jobs = self
            .executor
            .execute(&mut self.scope, &query::delete(JOBS.table, &ValueSet::new()))
            .await?;
        debug!(items, jobs, "Batch tables cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{create_pool, PoolSettings};
    use crate::migration::run_migrations;

    async fn store() -> SqliteBatchStore {
        let pool = create_pool("sqlite::memory:", &PoolSettings::default())
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteBatchStore::new(SqliteExecutor::new(pool))
    }

    #[tokio::test]
    async fn test_insert_header_and_items() {
        let store = store().await;
        let mut tx = store.begin().await.unwrap();
        let job = tx.insert_job(JobKind::Sync, 3, 1_000).await.unwrap();
        // Out of order on purpose: reads sort by position
        for position in [3, 1, 2] {
            tx.insert_item(job.id, position).await.unwrap();
        }
        assert_eq!(tx.update_status(job.id, JobStatus::Finished, 1_005).await.unwrap(), 1);
        tx.commit().await.unwrap();

        let stored = store.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(stored.kind, JobKind::Sync);
        assert_eq!(stored.status, JobStatus::Finished);
        assert_eq!(stored.started_at, 1_000);
        assert_eq!(stored.ended_at, Some(1_005));

        let positions: Vec<i64> = store
            .find_items(job.id)
            .await
            .unwrap()
            .iter()
            .map(|item| item.position)
            .collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_rollback_discards_items() {
        let store = store().await;
        let mut tx = store.begin().await.unwrap();
        let job = tx.insert_job(JobKind::Async, 2, 1).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_item(job.id, 1).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(store.find_items(job.id).await.unwrap().is_empty());
        assert_eq!(
            store.find_job(job.id).await.unwrap().unwrap().status,
            JobStatus::Running
        );
    }

    #[tokio::test]
    async fn test_item_for_missing_job_violates_foreign_key() {
        let store = store().await;
        let mut tx = store.begin().await.unwrap();
        assert!(tx.insert_item(404, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = store().await;
        let mut tx = store.begin().await.unwrap();
        let job = tx.insert_job(JobKind::Sync, 1, 1).await.unwrap();
        tx.insert_item(job.id, 1).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.clear_all().await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.find_job(job.id).await.unwrap().is_none());
        assert!(store.find_items(job.id).await.unwrap().is_empty());
    }
}
