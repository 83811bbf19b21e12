//! RPC Method Handlers
//!
//! Authenticates the caller, then delegates to the application services.

use crate::error::to_rpc_error;
use crate::types::{
    AccountIdRequest, ClearResponse, DeleteResponse, JobIdRequest, LoginRequest,
    QuantityRequest, TokenRequest, UpsertAccountRequest,
};
use batchdesk_core::application::{AccountService, AuthService, BatchService, LoginOutcome};
use batchdesk_core::domain::{Account, Identity, Job};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::debug;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected services
pub struct RpcHandler {
    batch: Arc<BatchService>,
    accounts: Arc<AccountService>,
    auth: Arc<AuthService>,
}

impl RpcHandler {
    pub fn new(
        batch: Arc<BatchService>,
        accounts: Arc<AccountService>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            batch,
            accounts,
            auth,
        }
    }

    fn identity(&self, token: &str) -> RpcResult<Identity> {
        self.auth.validate(token).map_err(to_rpc_error)
    }

    /// auth.login.v1
    pub async fn login(&self, params: LoginRequest) -> RpcResult<LoginOutcome> {
        self.auth
            .login(&params.email, &params.password)
            .await
            .map_err(to_rpc_error)
    }

    /// auth.validate.v1
    pub async fn validate(&self, params: TokenRequest) -> RpcResult<Identity> {
        self.identity(&params.token)
    }

    /// users.list.v1
    pub async fn list_users(&self, params: TokenRequest) -> RpcResult<Vec<Account>> {
        let identity = self.identity(&params.token)?;
        self.accounts.list(&identity).await.map_err(to_rpc_error)
    }

    /// users.get.v1
    pub async fn get_user(&self, params: AccountIdRequest) -> RpcResult<Option<Account>> {
        let identity = self.identity(&params.token)?;
        self.accounts
            .get(&identity, params.id)
            .await
            .map_err(to_rpc_error)
    }

    /// users.upsert.v1
    pub async fn upsert_user(&self, params: UpsertAccountRequest) -> RpcResult<Account> {
        let identity = self.identity(&params.token)?;
        self.accounts
            .upsert(&identity, params.account)
            .await
            .map_err(to_rpc_error)
    }

    /// users.delete.v1
    pub async fn delete_user(&self, params: AccountIdRequest) -> RpcResult<DeleteResponse> {
        let identity = self.identity(&params.token)?;
        let deleted = self
            .accounts
            .delete(&identity, params.id)
            .await
            .map_err(to_rpc_error)?;
        Ok(DeleteResponse { deleted })
    }

    /// insert.get.v1
    pub async fn get_job(&self, params: JobIdRequest) -> RpcResult<Option<Job>> {
        let identity = self.identity(&params.token)?;
        debug!(user_id = identity.user_id, job_id = params.id, "insert.get");
        self.batch.list_job(params.id).await.map_err(to_rpc_error)
    }

    /// insert.sync.v1
    pub async fn insert_sync(&self, params: QuantityRequest) -> RpcResult<Job> {
        let identity = self.identity(&params.token)?;
        debug!(user_id = identity.user_id, quantity = params.quantity, "insert.sync");
        self.batch
            .insert_sync(params.quantity)
            .await
            .map_err(to_rpc_error)
    }

    /// insert.async.v1
    pub async fn insert_async(&self, params: QuantityRequest) -> RpcResult<Job> {
        let identity = self.identity(&params.token)?;
        debug!(user_id = identity.user_id, quantity = params.quantity, "insert.async");
        self.batch
            .insert_async(params.quantity)
            .await
            .map_err(to_rpc_error)
    }

    /// insert.clear.v1
    pub async fn clear(&self, params: TokenRequest) -> RpcResult<ClearResponse> {
        let identity = self.identity(&params.token)?;
        debug!(user_id = identity.user_id, "insert.clear");
        self.batch.clear_all().await.map_err(to_rpc_error)?;
        Ok(ClearResponse { cleared: true })
    }
}
