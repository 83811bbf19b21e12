// Worker pool - bounded queue of async batch fills

pub mod constants;
mod panic_guard;
mod shutdown;

pub use panic_guard::{panic_message, report_join_error};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::batch::fill_async;
use crate::domain::Job;
use crate::error::{AppError, Result};
use crate::port::{BatchStore, TimeProvider};
use constants::DRAIN_POLL_INTERVAL;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One async batch whose header is already committed
#[derive(Debug, Clone)]
pub struct BatchTask {
    pub job: Job,
}

#[derive(Default)]
struct AdmissionState {
    reserved: usize,
    closed: bool,
}

/// Outstanding queue reservations. Once closed no new reservation is
/// admitted, and draining workers stay up until the count reaches zero.
#[derive(Default)]
struct Admission {
    state: std::sync::Mutex<AdmissionState>,
    released: Notify,
}

impl Admission {
    fn enter(self: &Arc<Self>) -> Result<Reservation> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(AppError::Unavailable("Batch workers are shutting down".to_string()));
        }
        state.reserved += 1;
        Ok(Reservation(Arc::clone(self)))
    }

    fn close(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed = true;
    }

    /// Closed with no reservation left
    fn is_settled(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed && state.reserved == 0
    }

    async fn wait_released(&self) {
        tokio::select! {
            _ = self.released.notified() => {}
            _ = tokio::time::sleep(DRAIN_POLL_INTERVAL) => {}
        }
    }
}

/// Counted reservation, given back on drop
struct Reservation(Arc<Admission>);

impl Drop for Reservation {
    fn drop(&mut self) {
        {
            let mut state = self.0.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.reserved = state.reserved.saturating_sub(1);
        }
        self.0.released.notify_waiters();
    }
}

/// Submission side of the worker pool
#[derive(Clone)]
pub struct BatchQueue {
    tx: mpsc::Sender<BatchTask>,
    admission: Arc<Admission>,
}

impl BatchQueue {
    /// Reserve capacity for one task, waiting while the queue is full.
    ///
    /// Fails with `Unavailable` once the pool is shutting down. A slot
    /// obtained before that is still drained by the workers.
    pub async fn reserve(&self) -> Result<QueueSlot<'_>> {
        let reservation = self.admission.enter()?;
        let permit = self
            .tx
            .reserve()
            .await
            .map_err(|_| AppError::Unavailable("Batch queue is closed".to_string()))?;
        Ok(QueueSlot {
            permit,
            _reservation: reservation,
        })
    }
}

/// Reserved queue capacity; dropping it unused gives the slot back
pub struct QueueSlot<'a> {
    permit: mpsc::Permit<'a, BatchTask>,
    // Released after the send in `submit`
    _reservation: Reservation,
}

impl QueueSlot<'_> {
    pub fn submit(self, task: BatchTask) {
        self.permit.send(task);
    }
}

/// Fixed set of workers draining the batch queue
pub struct BatchWorkerPool {
    shutdown: ShutdownSender,
    admission: Arc<Admission>,
    handles: Vec<JoinHandle<()>>,
}

impl BatchWorkerPool {
    /// Spawn `workers` tasks sharing one queue of `capacity` slots
    pub fn start(
        workers: usize,
        capacity: usize,
        store: Arc<dyn BatchStore>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> (Self, BatchQueue) {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let (shutdown, token) = shutdown_channel();
        let admission = Arc::new(Admission::default());

        let handles = (0..workers)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&rx),
                    Arc::clone(&store),
                    Arc::clone(&time_provider),
                    Arc::clone(&admission),
                    token.clone(),
                ))
            })
            .collect();

        info!(workers, capacity, "Batch worker pool started");
        (
            Self {
                shutdown,
                admission: Arc::clone(&admission),
                handles,
            },
            BatchQueue { tx, admission },
        )
    }

    /// Stop accepting work, let workers drain what is queued or already
    /// reserved, and wait up to `timeout` for them. Workers still busy after
    /// that are aborted.
    pub async fn shutdown(mut self, timeout: Duration) {
        self.admission.close();
        self.shutdown.shutdown();

        let drained = tokio::time::timeout(timeout, async {
            for handle in &mut self.handles {
                if let Err(join_err) = handle.await {
                    warn!(error = %join_err, "Batch worker ended abnormally");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(timeout_ms = timeout.as_millis() as u64, "Batch workers did not drain in time, aborting");
            for handle in &self.handles {
                handle.abort();
            }
        } else {
            info!("Batch worker pool stopped");
        }
    }
}

async fn run_worker(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<BatchTask>>>,
    store: Arc<dyn BatchStore>,
    time_provider: Arc<dyn TimeProvider>,
    admission: Arc<Admission>,
    mut shutdown: ShutdownToken,
) {
    debug!(worker = id, "Batch worker started");
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                task = rx.recv() => task,
                _ = shutdown.wait() => None,
            }
        };
        match next {
            Some(task) => run_task(id, &store, &time_provider, task).await,
            None => break,
        }
    }

    // Drain whatever was queued before the signal, and whatever holders of
    // an earlier reservation still submit
    loop {
        let next = rx.lock().await.try_recv();
        match next {
            Ok(task) => run_task(id, &store, &time_provider, task).await,
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) if admission.is_settled() => {
                // A reservation is released only after its send
                let last = rx.lock().await.try_recv();
                match last {
                    Ok(task) => run_task(id, &store, &time_provider, task).await,
                    Err(_) => break,
                }
            }
            Err(TryRecvError::Empty) => admission.wait_released().await,
        }
    }
    debug!(worker = id, "Batch worker stopped");
}

/// Run one fill on its own task so a panic stays contained
async fn run_task(
    id: usize,
    store: &Arc<dyn BatchStore>,
    time_provider: &Arc<dyn TimeProvider>,
    task: BatchTask,
) {
    let job_id = task.job.id;
    let store = Arc::clone(store);
    let time_provider = Arc::clone(time_provider);

    let handle = tokio::spawn(async move {
        fill_async(store.as_ref(), time_provider.as_ref(), task.job).await
    });

    match handle.await {
        Ok(outcome) => debug!(worker = id, job_id, ?outcome, "Batch task done"),
        Err(join_err) => {
            report_join_error(id, join_err);
            warn!(worker = id, job_id, "Batch left as the store has it after worker failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChildItem, JobId, JobKind, JobStatus};
    use crate::port::batch_store::mocks::InMemoryBatchStore;
    use crate::port::time_provider::mocks::FixedTimeProvider;
    use crate::port::{BatchTransaction, Transaction};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn committed_header(store: &InMemoryBatchStore, quantity: i64) -> Job {
        let mut tx = store.begin().await.unwrap();
        let job = tx.insert_job(JobKind::Async, quantity, 1).await.unwrap();
        tx.commit().await.unwrap();
        job
    }

    async fn wait_status(store: &InMemoryBatchStore, id: JobId, status: JobStatus) {
        for _ in 0..200 {
            let job = store.find_job(id).await.unwrap().unwrap();
            if job.status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never reached {}", id, status);
    }

    /// Panics on the first `begin`, behaves normally afterwards
    struct PanicOnceStore {
        inner: InMemoryBatchStore,
        tripped: AtomicBool,
    }

    #[async_trait]
    impl BatchStore for PanicOnceStore {
        async fn begin(&self) -> Result<Box<dyn BatchTransaction>> {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                panic!("store exploded");
            }
            self.inner.begin().await
        }

        async fn find_job(&self, id: JobId) -> Result<Option<Job>> {
            self.inner.find_job(id).await
        }

        async fn find_items(&self, job_id: JobId) -> Result<Vec<ChildItem>> {
            self.inner.find_items(job_id).await
        }
    }

    #[tokio::test]
    async fn test_worker_survives_panicking_task() {
        let inner = InMemoryBatchStore::new();
        let first = committed_header(&inner, 2).await;
        let second = committed_header(&inner, 2).await;

        let store = Arc::new(PanicOnceStore {
            inner: inner.clone(),
            tripped: AtomicBool::new(false),
        });
        let (pool, queue) =
            BatchWorkerPool::start(1, 4, store, Arc::new(FixedTimeProvider::new(50)));

        queue.reserve().await.unwrap().submit(BatchTask { job: first.clone() });
        queue.reserve().await.unwrap().submit(BatchTask { job: second.clone() });

        wait_status(&inner, second.id, JobStatus::Finished).await;
        // The panicking fill never got to touch its job
        let untouched = inner.find_job(first.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, JobStatus::Running);

        pool.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_tasks() {
        let store = InMemoryBatchStore::new();
        let mut jobs = Vec::new();
        for quantity in [1, 2, 3] {
            jobs.push(committed_header(&store, quantity).await);
        }

        let (pool, queue) = BatchWorkerPool::start(
            2,
            8,
            Arc::new(store.clone()),
            Arc::new(FixedTimeProvider::new(50)),
        );
        for job in &jobs {
            queue.reserve().await.unwrap().submit(BatchTask { job: job.clone() });
        }
        pool.shutdown(Duration::from_secs(2)).await;

        for job in &jobs {
            let stored = store.find_job(job.id).await.unwrap().unwrap();
            assert_eq!(stored.status, JobStatus::Finished);
            assert_eq!(store.committed_items(job.id).len() as i64, job.quantity);
        }
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_outstanding_reservation() {
        let store = InMemoryBatchStore::new();
        let job = committed_header(&store, 2).await;
        let (pool, queue) = BatchWorkerPool::start(
            1,
            4,
            Arc::new(store.clone()),
            Arc::new(FixedTimeProvider::new(50)),
        );

        let slot = queue.reserve().await.unwrap();
        let stopping = tokio::spawn(pool.shutdown(Duration::from_secs(2)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stopping.is_finished());

        slot.submit(BatchTask { job: job.clone() });
        stopping.await.unwrap();

        let stored = store.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Finished);
        assert_eq!(store.committed_items(job.id).len(), 2);
        assert!(matches!(queue.reserve().await, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_reserve_after_shutdown_is_unavailable() {
        let (pool, queue) = BatchWorkerPool::start(
            1,
            1,
            Arc::new(InMemoryBatchStore::new()),
            Arc::new(FixedTimeProvider::new(0)),
        );
        pool.shutdown(Duration::from_secs(1)).await;

        let err = queue.reserve().await.err().unwrap();
        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_dropped_slot_returns_capacity() {
        let (_pool, queue) = BatchWorkerPool::start(
            1,
            1,
            Arc::new(InMemoryBatchStore::new()),
            Arc::new(FixedTimeProvider::new(0)),
        );
        drop(queue.reserve().await.unwrap());
        let again = tokio::time::timeout(Duration::from_millis(200), queue.reserve()).await;
        assert!(again.is_ok());
    }
}
