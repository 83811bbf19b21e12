// Application Layer - Use Cases and Business Logic

pub mod account;
pub mod auth;
pub mod batch;
pub mod worker;

// Re-exports
pub use account::AccountService;
pub use auth::{AuthService, LoginOutcome, TOKEN_TTL_SECS};
pub use batch::{fill_async, BatchService, FillOutcome};
pub use worker::{
    shutdown_channel, BatchQueue, BatchTask, BatchWorkerPool, QueueSlot, ShutdownSender,
    ShutdownToken,
};
