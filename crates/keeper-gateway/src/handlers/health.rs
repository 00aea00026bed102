//! Liveness and introspection handlers.

use crate::error::GatewayError;
use crate::methods::{CallContext, MethodHandler, MethodRegistry};
use crate::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Weak;

/// `ping`: liveness probe.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn call(&self, _ctx: &CallContext, _params: Option<Value>) -> Result<Value> {
        Ok(json!({
            "pong": true,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

/// `system.info`: build and platform details.
pub struct SystemInfoHandler;

#[async_trait]
impl MethodHandler for SystemInfoHandler {
    async fn call(&self, _ctx: &CallContext, _params: Option<Value>) -> Result<Value> {
        Ok(json!({
            "name": "keeper",
            "version": env!("CARGO_PKG_VERSION"),
            "platform": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }))
    }
}

/// `system.methods`: names of every registered method.
pub struct ListMethodsHandler {
    // weak: the registry owns this handler
    registry: Weak<MethodRegistry>,
}

impl ListMethodsHandler {
    pub fn new(registry: Weak<MethodRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl MethodHandler for ListMethodsHandler {
    async fn call(&self, _ctx: &CallContext, _params: Option<Value>) -> Result<Value> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| GatewayError::Internal("method registry dropped".to_string()))?;
        Ok(json!({ "methods": registry.list().await }))
    }
}
