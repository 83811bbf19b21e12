//! Shared fixture: a migrated SQLite file in a temp dir with both stores
//! and the application services wired the way the daemon wires them.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use batchdesk_api_rpc::JwtTokenIssuer;
use batchdesk_core::application::{AccountService, AuthService, BatchService, BatchWorkerPool};
use batchdesk_core::domain::{Job, JobId};
use batchdesk_core::port::time_provider::SystemTimeProvider;
use batchdesk_core::port::{AccountStore, BatchStore, TimeProvider};
use batchdesk_infra_sqlite::{
    create_pool, run_migrations, PoolSettings, SqliteAccountStore, SqliteBatchStore,
    SqliteExecutor,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const JWT_SECRET: &str = "integration-secret";

pub struct TestApp {
    pub pool: SqlitePool,
    pub batch_store: Arc<dyn BatchStore>,
    pub account_store: Arc<dyn AccountStore>,
    pub batch: Arc<BatchService>,
    pub accounts: Arc<AccountService>,
    pub auth: Arc<AuthService>,
    pub workers: Option<BatchWorkerPool>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("batchdesk.db").display());
        let pool = create_pool(&url, &PoolSettings::default()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let executor = SqliteExecutor::new(pool.clone());
        let batch_store: Arc<dyn BatchStore> = Arc::new(SqliteBatchStore::new(executor.clone()));
        let account_store: Arc<dyn AccountStore> = Arc::new(SqliteAccountStore::new(executor));
        let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);

        let (workers, queue) =
            BatchWorkerPool::start(2, 8, Arc::clone(&batch_store), Arc::clone(&time));

        Self {
            batch: Arc::new(BatchService::new(
                Arc::clone(&batch_store),
                queue,
                Arc::clone(&time),
            )),
            accounts: Arc::new(AccountService::new(Arc::clone(&account_store))),
            auth: Arc::new(AuthService::new(
                Arc::clone(&account_store),
                Arc::new(JwtTokenIssuer::new(JWT_SECRET)),
                time,
            )),
            pool,
            batch_store,
            account_store,
            workers: Some(workers),
            _dir: dir,
        }
    }

    /// Make every child insert at `position` abort, as a failing database would
    pub async fn fail_item_at(&self, position: i64) {
        let sql = format!(
            "CREATE TRIGGER fail_item_{position} BEFORE INSERT ON job_items \
             WHEN NEW.position = {position} \
             BEGIN SELECT RAISE(ABORT, 'forced failure'); END"
        );
        sqlx::query(&sql).execute(&self.pool).await.unwrap();
    }

    /// Poll until the job leaves Running, or panic after a few seconds
    pub async fn wait_terminal(&self, id: JobId) -> Job {
        for _ in 0..100 {
            let job = self.batch.list_job(id).await.unwrap().unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("job {id} still Running");
    }

    pub async fn stop_workers(&mut self) {
        if let Some(workers) = self.workers.take() {
            workers.shutdown(Duration::from_secs(5)).await;
        }
    }
}
