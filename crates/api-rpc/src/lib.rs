//! JSON-RPC API Layer
//!
//! Exposes login, user management and batch insert methods over JSON-RPC 2.0,
//! plus the JWT implementation of the token port.

pub mod auth;
pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use auth::JwtTokenIssuer;
pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
