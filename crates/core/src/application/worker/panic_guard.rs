// Panic isolation for batch tasks
use std::any::Any;
use tokio::task::JoinError;
use tracing::error;

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Log a join failure of a spawned batch task. Returns the panic message
/// when the task panicked, `None` when it was cancelled.
pub fn report_join_error(worker: usize, join_err: JoinError) -> Option<String> {
    if join_err.is_panic() {
        let msg = panic_message(join_err.into_panic().as_ref());
        error!(worker, panic_msg = %msg, "Batch task panicked");
        Some(msg)
    } else {
        error!(worker, "Batch task cancelled");
        None
    }
}
