// Port Layer - Interfaces for external dependencies

pub mod account_store;
pub mod batch_store;
pub mod time_provider;
pub mod token_issuer;
pub mod transaction;

// Re-exports
pub use account_store::{AccountStore, AccountTransaction};
pub use batch_store::{BatchStore, BatchTransaction};
pub use time_provider::TimeProvider;
pub use token_issuer::TokenIssuer;
pub use transaction::Transaction;
