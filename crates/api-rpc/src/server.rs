//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP/WebSocket on a TCP address.

use crate::error::RpcServerError;
use crate::handler::RpcHandler;
use crate::types::{
    AccountIdRequest, JobIdRequest, LoginRequest, QuantityRequest, TokenRequest,
    UpsertAccountRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 8000;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// Register `$name` as a method that parses `$req` by name and calls
/// `handler.$method`
macro_rules! register {
    ($module:expr, $handler:expr, $name:literal, $req:ty, $method:ident) => {{
        let handler = Arc::clone(&$handler);
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$method(req).await
                }
            })
            .map_err(|e| RpcServerError::Register {
                method: $name,
                reason: e.to_string(),
            })?;
    }};
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Bind, register every method and start serving.
    ///
    /// Returns the handle (stop it to shut the transport down) and the bound
    /// address, which differs from the configured one when port 0 is used.
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr), RpcServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| RpcServerError::Bind {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        let local_addr = server.local_addr().map_err(|e| RpcServerError::Bind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

        let mut module = RpcModule::new(());

        register!(module, self.handler, "auth.login.v1", LoginRequest, login);
        register!(module, self.handler, "auth.validate.v1", TokenRequest, validate);

        register!(module, self.handler, "users.list.v1", TokenRequest, list_users);
        register!(module, self.handler, "users.get.v1", AccountIdRequest, get_user);
        register!(module, self.handler, "users.upsert.v1", UpsertAccountRequest, upsert_user);
        register!(module, self.handler, "users.delete.v1", AccountIdRequest, delete_user);

        register!(module, self.handler, "insert.get.v1", JobIdRequest, get_job);
        register!(module, self.handler, "insert.sync.v1", QuantityRequest, insert_sync);
        register!(module, self.handler, "insert.async.v1", QuantityRequest, insert_async);
        register!(module, self.handler, "insert.clear.v1", TokenRequest, clear);

        info!(addr = %local_addr, methods = module.method_names().count(), "JSON-RPC server started");

        let handle = server.start(module);
        Ok((handle, local_addr))
    }
}
