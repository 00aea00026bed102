//! RPC method registry and dispatch.

use crate::error::GatewayError;
use crate::Result;
use async_trait::async_trait;
use keeper_core::types::CallerIdentity;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Per-call state handed to every handler.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    caller: Option<CallerIdentity>,
}

impl CallContext {
    /// Context for a public method; no caller is known.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(caller: CallerIdentity) -> Self {
        Self {
            caller: Some(caller),
        }
    }

    /// The resolved caller, or an auth error for anonymous calls.
    pub fn caller(&self) -> Result<&CallerIdentity> {
        self.caller
            .as_ref()
            .ok_or_else(|| GatewayError::Auth("caller identity required".to_string()))
    }
}

/// Trait for RPC method handlers.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Handle the method call.
    async fn call(&self, ctx: &CallContext, params: Option<Value>) -> Result<Value>;
}

/// Decode method params, treating absent params as an empty object.
pub fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T> {
    let value = match params {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(value) => value,
    };
    serde_json::from_value(value).map_err(|e| GatewayError::InvalidParams(e.to_string()))
}

/// Registry for RPC methods.
pub struct MethodRegistry {
    methods: RwLock<HashMap<String, Arc<dyn MethodHandler>>>,
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self {
            methods: RwLock::new(HashMap::new()),
        }
    }

    /// Register a method handler, replacing any previous one.
    pub async fn register(&self, name: impl Into<String>, handler: Arc<dyn MethodHandler>) {
        let mut methods = self.methods.write().await;
        methods.insert(name.into(), handler);
    }

    /// Call a method.
    pub async fn call(&self, name: &str, ctx: &CallContext, params: Option<Value>) -> Result<Value> {
        let handler = {
            let methods = self.methods.read().await;
            methods
                .get(name)
                .cloned()
                .ok_or_else(|| GatewayError::MethodNotFound(name.to_string()))?
        };

        debug!("Calling method: {}", name);
        handler.call(ctx, params).await
    }

    /// Registered method names, sorted.
    pub async fn list(&self) -> Vec<String> {
        let methods = self.methods.read().await;
        let mut names: Vec<String> = methods.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::Deserialize;

    struct Echo;

    #[async_trait]
    impl MethodHandler for Echo {
        async fn call(&self, ctx: &CallContext, params: Option<Value>) -> Result<Value> {
            let caller = ctx.caller()?;
            Ok(serde_json::json!({ "caller": caller.user_id, "params": params }))
        }
    }

    fn caller() -> CallerIdentity {
        CallerIdentity {
            user_id: "u1".to_string(),
            issued_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let registry = MethodRegistry::new();
        registry.register("echo", Arc::new(Echo)).await;

        let ctx = CallContext::authenticated(caller());
        let value = registry
            .call("echo", &ctx, Some(serde_json::json!({"x": 1})))
            .await
            .unwrap();
        assert_eq!(value["caller"], "u1");
        assert_eq!(value["params"]["x"], 1);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let registry = MethodRegistry::new();
        let err = registry
            .call("nope", &CallContext::anonymous(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MethodNotFound(_)));
        assert_eq!(err.code(), -32601);
    }

    #[tokio::test]
    async fn test_anonymous_caller_rejected() {
        let registry = MethodRegistry::new();
        registry.register("echo", Arc::new(Echo)).await;
        let err = registry
            .call("echo", &CallContext::anonymous(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32001);
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let registry = MethodRegistry::new();
        registry.register("b", Arc::new(Echo)).await;
        registry.register("a", Arc::new(Echo)).await;
        assert_eq!(registry.list().await, vec!["a", "b"]);
    }

    #[derive(Debug, Deserialize)]
    struct Params {
        #[serde(default)]
        id: String,
    }

    #[test]
    fn test_parse_params() {
        let p: Params = parse_params(None).unwrap();
        assert!(p.id.is_empty());

        let p: Params = parse_params(Some(serde_json::json!({"id": "a1"}))).unwrap();
        assert_eq!(p.id, "a1");

        let err = parse_params::<Params>(Some(serde_json::json!([1, 2]))).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));
    }
}
