// Domain Layer - Pure business logic and entities

pub mod account;
pub mod error;
pub mod job;

// Re-exports
pub use account::{Account, AccountId, Claims, Identity, ADMIN_ROLE};
pub use error::DomainError;
pub use job::{validate_quantity, ChildItem, Job, JobId, JobKind, JobStatus};
