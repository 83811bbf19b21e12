// Batchdesk Infrastructure - SQLite Adapter
// Implements: BatchStore, AccountStore on top of a transactional executor

mod account_store;
mod batch_store;
mod connection;
mod error;
mod executor;
mod migration;
pub mod query;
pub mod record;
pub mod rows;
mod transaction;

pub use account_store::{SqliteAccountStore, SqliteAccountTransaction};
pub use batch_store::{SqliteBatchStore, SqliteBatchTransaction};
pub use connection::{create_pool, spawn_health_check, PoolSettings};
pub use error::{map_sqlx_error, map_tx_error};
pub use executor::SqliteExecutor;
pub use migration::run_migrations;
pub use transaction::TxScope;
