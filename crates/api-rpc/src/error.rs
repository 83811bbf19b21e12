//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use batchdesk_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;
use thiserror::Error;
use tracing::error;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const UNAUTHORIZED: i32 = 4003;
    pub const UNAUTHENTICATED: i32 = 4004;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const UNAVAILABLE: i32 = 5003;
}

/// Failure to bring the server up
#[derive(Debug, Error)]
pub enum RpcServerError {
    #[error("Failed to build server on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Failed to register method {method}: {reason}")]
    Register { method: &'static str, reason: String },
}

fn owned(code: i32, msg: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.into(), None::<()>)
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => owned(code::VALIDATION_ERROR, msg),
        AppError::Domain(e) => owned(code::VALIDATION_ERROR, e.to_string()),
        AppError::Unauthorized(msg) => owned(code::UNAUTHORIZED, msg),
        AppError::Unauthenticated(msg) => owned(code::UNAUTHENTICATED, msg),
        AppError::Unavailable(msg) => owned(code::UNAVAILABLE, msg),
        AppError::Acquisition(msg) | AppError::Transaction(msg) | AppError::Query(msg) => {
            error!(error = %msg, "Store failure surfaced to client");
            owned(code::DB_ERROR, msg)
        }
        AppError::Config(msg) | AppError::Internal(msg) => owned(code::INTERNAL_ERROR, msg),
    }
}
