//! Shared helpers for driving a gateway router in-process.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use keeper_core::config::AuthConfig;
use keeper_core::SecretString;
use keeper_gateway::{Gateway, GatewayConfig};
use keeper_storage::Backends;
use keeper_vault::{Argon2Hasher, Vault};
use serde_json::{json, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tower::ServiceExt;

/// A gateway router plus the backends behind it.
pub struct TestServer {
    pub backends: Backends,
    pub router: Router,
    next_id: AtomicU64,
}

impl TestServer {
    /// Gateway over fresh in-memory backends.
    pub async fn in_memory() -> Self {
        Self::with_backends(Backends::in_memory()).await
    }

    pub async fn with_backends(backends: Backends) -> Self {
        let auth = AuthConfig {
            token_secret: SecretString::new("integration-test-signing-key"),
            token_ttl_secs: 3600,
        };
        let hasher = Argon2Hasher::with_params(1024, 1, 1).expect("argon2 params");
        let vault = Vault::with_hasher(&backends, &auth, Arc::new(hasher));
        let gateway = Gateway::new(GatewayConfig::default(), vault).await;

        Self {
            backends,
            router: gateway.router(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Send one JSON-RPC call and return the decoded response envelope.
    pub async fn call(&self, method: &str, params: Value, token: Option<&str>) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});

        let mut request = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = request
            .body(Body::from(body.to_string()))
            .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(value["id"], id);
        value
    }

    /// Call and unwrap the `result` member.
    pub async fn ok(&self, method: &str, params: Value, token: Option<&str>) -> Value {
        let value = self.call(method, params, token).await;
        assert!(value.get("error").is_none(), "{method} failed: {value}");
        value["result"].clone()
    }

    /// Call and unwrap the `error` member.
    pub async fn err(&self, method: &str, params: Value, token: Option<&str>) -> Value {
        let value = self.call(method, params, token).await;
        assert!(value.get("result").is_none(), "{method} unexpectedly succeeded: {value}");
        value["error"].clone()
    }

    /// Register `username` and return a bearer token for it.
    pub async fn sign_up(&self, username: &str, password: &str) -> String {
        let creds = json!({"username": username, "password": password});
        self.ok("auth.register", creds.clone(), None).await;
        let result = self.ok("auth.login", creds, None).await;
        result["token"].as_str().expect("token").to_string()
    }
}
