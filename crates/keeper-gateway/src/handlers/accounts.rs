//! Account registration and login handlers.

use super::HandlerContext;
use crate::methods::{parse_params, CallContext, MethodHandler};
use crate::Result;
use async_trait::async_trait;
use keeper_core::SecretString;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
struct CredentialsParams {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: SecretString,
}

/// `auth.register`: create an account.
pub struct RegisterHandler {
    context: Arc<HandlerContext>,
}

impl RegisterHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for RegisterHandler {
    async fn call(&self, _ctx: &CallContext, params: Option<Value>) -> Result<Value> {
        let params: CredentialsParams = parse_params(params)?;
        let account = self
            .context
            .vault
            .accounts
            .register(&params.username, &params.password)
            .await?;

        info!(user_id = %account.user_id, "account registered");
        Ok(json!({
            "message": format!("user {} registered", account.username),
            "user_id": account.user_id,
        }))
    }
}

/// `auth.login`: exchange credentials for a bearer token.
pub struct LoginHandler {
    context: Arc<HandlerContext>,
}

impl LoginHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for LoginHandler {
    async fn call(&self, _ctx: &CallContext, params: Option<Value>) -> Result<Value> {
        let params: CredentialsParams = parse_params(params)?;
        let token = self
            .context
            .vault
            .accounts
            .login(&params.username, &params.password)
            .await?;

        Ok(json!({ "token": token }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing;

    #[tokio::test]
    async fn test_register_then_login() {
        let (_backends, ctx) = testing::context();
        let register = RegisterHandler::new(ctx.clone());
        let login = LoginHandler::new(ctx.clone());
        let anon = CallContext::anonymous();

        let registered = register
            .call(&anon, Some(json!({"username": "alice", "password": "pw1"})))
            .await
            .unwrap();
        assert_eq!(registered["message"], "user alice registered");
        let user_id = registered["user_id"].as_str().unwrap();
        assert!(!user_id.is_empty());

        let value = login
            .call(&anon, Some(json!({"username": "alice", "password": "pw1"})))
            .await
            .unwrap();
        let token = value["token"].as_str().unwrap();
        let caller = ctx
            .vault
            .guard
            .resolve(Some(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(caller.user_id, user_id);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let (_backends, ctx) = testing::context();
        let register = RegisterHandler::new(ctx);
        let anon = CallContext::anonymous();

        register
            .call(&anon, Some(json!({"username": "alice", "password": "pw1"})))
            .await
            .unwrap();
        let err = register
            .call(&anon, Some(json!({"username": "alice", "password": "pw2"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "username_already_exists");
        assert_eq!(err.code(), -32003);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let (_backends, ctx) = testing::context();
        let anon = CallContext::anonymous();
        RegisterHandler::new(ctx.clone())
            .call(&anon, Some(json!({"username": "alice", "password": "pw1"})))
            .await
            .unwrap();

        let err = LoginHandler::new(ctx)
            .call(&anon, Some(json!({"username": "alice", "password": "wrongpw"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_password");
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let (_backends, ctx) = testing::context();
        let err = RegisterHandler::new(ctx)
            .call(&CallContext::anonymous(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}
