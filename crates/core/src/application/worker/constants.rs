// Worker pool constants
use std::time::Duration;

/// Workers started when configuration does not say otherwise
pub const DEFAULT_BATCH_WORKERS: usize = 4;

/// Pending async batches the queue holds before submitters wait
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// How long shutdown waits for workers to drain the queue
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound between queue checks while draining workers wait for
/// outstanding reservations
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);
