//! RPC Request/Response Types
//!
//! Every method except `auth.login.v1` carries the caller's `token`.

use batchdesk_core::domain::{Account, AccountId, JobId};
use serde::{Deserialize, Serialize};

/// auth.login.v1
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// auth.validate.v1, users.list.v1, insert.clear.v1
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// users.get.v1, users.delete.v1
#[derive(Debug, Deserialize)]
pub struct AccountIdRequest {
    pub token: String,
    pub id: AccountId,
}

/// users.upsert.v1
#[derive(Debug, Deserialize)]
pub struct UpsertAccountRequest {
    pub token: String,
    pub account: Account,
}

/// insert.get.v1
#[derive(Debug, Deserialize)]
pub struct JobIdRequest {
    pub token: String,
    pub id: JobId,
}

/// insert.sync.v1, insert.async.v1
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub token: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub cleared: bool,
}
