// Transaction port for atomic operations

use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
///
/// Both methods are idempotent: once the transaction is closed, a second
/// commit or rollback is a logged no-op. Dropping an open transaction rolls
/// it back.
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(&mut self) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(&mut self) -> Result<()>;
}
