//! JSON-RPC gateway for Keeper.
//!
//! This crate provides:
//! - JSON-RPC 2.0 over HTTP (`POST /rpc`) and a `GET /health` probe
//! - Account registration and login
//! - Owner-scoped data item methods behind bearer authentication

pub mod error;
pub mod handlers;
pub mod methods;
pub mod rpc;
pub mod server;

pub use error::GatewayError;
pub use handlers::HandlerContext;
pub use methods::{CallContext, MethodHandler, MethodRegistry};
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::{Gateway, GatewayConfig};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
