// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// "Not found" is deliberately absent: lookups return `Option` and callers
/// must tell an empty result apart from a failed query.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Pool exhausted, closed, or handed out an unhealthy connection
    #[error("Connection acquisition error: {0}")]
    Acquisition(String),

    /// BEGIN / COMMIT / ROLLBACK rejected by the store
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Malformed SQL, constraint violation or row mapping failure
    #[error("Query error: {0}")]
    Query(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by classifying into Acquisition / Transaction / Query
