// Batch Store Port (Interface)

use crate::domain::{ChildItem, Job, JobId, JobKind, JobStatus};
use crate::error::Result;
use crate::port::Transaction;
use async_trait::async_trait;

/// Persistence for batch headers and their child items
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Begin a new transaction
    async fn begin(&self) -> Result<Box<dyn BatchTransaction>>;

    /// Find a job header by ID (auto-scoped read, `items` left empty)
    async fn find_job(&self, id: JobId) -> Result<Option<Job>>;

    /// Child items of a job, ordered by position (auto-scoped read)
    async fn find_items(&self, job_id: JobId) -> Result<Vec<ChildItem>>;
}

/// Batch operations within a transaction
#[async_trait]
pub trait BatchTransaction: Transaction {
    /// Insert a header in status Running and return it with its assigned ID
    async fn insert_job(&mut self, kind: JobKind, quantity: i64, started_at: i64) -> Result<Job>;

    /// Insert one child item
    async fn insert_item(&mut self, job_id: JobId, position: i64) -> Result<()>;

    /// Set status and ended_at of a header, returning affected rows
    async fn update_status(&mut self, job_id: JobId, status: JobStatus, ended_at: i64)
        -> Result<u64>;

    /// Delete every child item, then every header
    async fn clear_all(&mut self) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct State {
        jobs: BTreeMap<JobId, Job>,
        items: Vec<ChildItem>,
        next_job_id: i64,
        next_item_id: i64,
    }

    enum Op {
        InsertJob(Job),
        InsertItem(ChildItem),
        UpdateStatus {
            job_id: JobId,
            status: JobStatus,
            ended_at: i64,
        },
        Clear,
    }

    /// In-memory BatchStore; staged writes become visible on commit only
    #[derive(Clone, Default)]
    pub struct InMemoryBatchStore {
        state: Arc<Mutex<State>>,
        fail_position: Option<i64>,
        begin_count: Arc<AtomicUsize>,
    }

    impl InMemoryBatchStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every insert of a child at `position` fails
        pub fn failing_at(position: i64) -> Self {
            Self {
                fail_position: Some(position),
                ..Self::default()
            }
        }

        /// Number of transactions opened so far
        pub fn begin_count(&self) -> usize {
            self.begin_count.load(Ordering::SeqCst)
        }

        /// Committed items of a job, in insertion order
        pub fn committed_items(&self, job_id: JobId) -> Vec<ChildItem> {
            let state = self.state.lock().unwrap();
            state
                .items
                .iter()
                .filter(|item| item.parent_id == job_id)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl BatchStore for InMemoryBatchStore {
        async fn begin(&self) -> Result<Box<dyn BatchTransaction>> {
            self.begin_count.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(InMemoryBatchTransaction {
                state: Arc::clone(&self.state),
                fail_position: self.fail_position,
                staged: Vec::new(),
                open: true,
            }))
        }

        async fn find_job(&self, id: JobId) -> Result<Option<Job>> {
            Ok(self.state.lock().unwrap().jobs.get(&id).cloned())
        }

        async fn find_items(&self, job_id: JobId) -> Result<Vec<ChildItem>> {
            let mut items = self.committed_items(job_id);
            items.sort_by_key(|item| item.position);
            Ok(items)
        }
    }

    pub struct InMemoryBatchTransaction {
        state: Arc<Mutex<State>>,
        fail_position: Option<i64>,
        staged: Vec<Op>,
        open: bool,
    }

    impl InMemoryBatchTransaction {
        fn ensure_open(&self) -> Result<()> {
            if !self.open {
                return Err(AppError::Transaction("transaction already closed".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Transaction for InMemoryBatchTransaction {
        async fn commit(&mut self) -> Result<()> {
            if !self.open {
                return Ok(());
            }
            self.open = false;
            let mut state = self.state.lock().unwrap();
            for op in self.staged.drain(..) {
                match op {
                    Op::InsertJob(job) => {
                        state.jobs.insert(job.id, job);
                    }
                    Op::InsertItem(item) => state.items.push(item),
                    Op::UpdateStatus {
                        job_id,
                        status,
                        ended_at,
                    } => {
                        if let Some(job) = state.jobs.get_mut(&job_id) {
                            job.status = status;
                            job.ended_at = Some(ended_at);
                        }
                    }
                    Op::Clear => {
                        state.items.clear();
                        state.jobs.clear();
                    }
                }
            }
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.open = false;
            self.staged.clear();
            Ok(())
        }
    }

    #[async_trait]
    impl BatchTransaction for InMemoryBatchTransaction {
        async fn insert_job(
            &mut self,
            kind: JobKind,
            quantity: i64,
            started_at: i64,
        ) -> Result<Job> {
            self.ensure_open()?;
            let id = {
                let mut state = self.state.lock().unwrap();
                state.next_job_id += 1;
                state.next_job_id
            };
            let job = Job {
                id,
                kind,
                quantity,
                status: JobStatus::Running,
                started_at,
                ended_at: None,
                items: Vec::new(),
            };
            self.staged.push(Op::InsertJob(job.clone()));
            Ok(job)
        }

        async fn insert_item(&mut self, job_id: JobId, position: i64) -> Result<()> {
            self.ensure_open()?;
            if self.fail_position == Some(position) {
                return Err(AppError::Query(format!(
                    "forced failure inserting position {}",
                    position
                )));
            }
            let id = {
                let mut state = self.state.lock().unwrap();
                state.next_item_id += 1;
                state.next_item_id
            };
            self.staged.push(Op::InsertItem(ChildItem {
                id,
                parent_id: job_id,
                position,
            }));
            Ok(())
        }

        async fn update_status(
            &mut self,
            job_id: JobId,
            status: JobStatus,
            ended_at: i64,
        ) -> Result<u64> {
            self.ensure_open()?;
            let known = self.state.lock().unwrap().jobs.contains_key(&job_id)
                || self
                    .staged
                    .iter()
                    .any(|op| matches!(op, Op::InsertJob(job) if job.id == job_id));
            if !known {
                return Ok(0);
            }
            self.staged.push(Op::UpdateStatus {
                job_id,
                status,
                ended_at,
            });
            Ok(1)
        }

        async fn clear_all(&mut self) -> Result<()> {
            self.ensure_open()?;
            self.staged.push(Op::Clear);
            Ok(())
        }
    }
}
