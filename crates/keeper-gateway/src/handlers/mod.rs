//! RPC method handlers.

pub mod accounts;
pub mod data;
pub mod health;

use crate::methods::MethodRegistry;
use keeper_vault::Vault;
use std::sync::Arc;

pub use accounts::{LoginHandler, RegisterHandler};
pub use data::{
    CreateDataHandler, DeleteDataHandler, GetDataHandler, ListDataHandler, UpdateDataHandler,
};
pub use health::{ListMethodsHandler, PingHandler, SystemInfoHandler};

/// Methods callable without a bearer credential.
pub const PUBLIC_METHODS: &[&str] = &[
    "auth.register",
    "auth.login",
    "ping",
    "system.info",
    "system.methods",
];

pub fn is_public(method: &str) -> bool {
    PUBLIC_METHODS.contains(&method)
}

/// Shared state for handlers.
#[derive(Clone)]
pub struct HandlerContext {
    pub vault: Vault,
}

impl HandlerContext {
    pub fn new(vault: Vault) -> Self {
        Self { vault }
    }
}

/// Register all built-in method handlers.
pub async fn register_all(registry: &Arc<MethodRegistry>, context: HandlerContext) {
    let ctx = Arc::new(context);

    // Account methods
    registry
        .register("auth.register", Arc::new(RegisterHandler::new(ctx.clone())))
        .await;
    registry
        .register("auth.login", Arc::new(LoginHandler::new(ctx.clone())))
        .await;

    // Data item methods
    registry
        .register("data.get", Arc::new(GetDataHandler::new(ctx.clone())))
        .await;
    registry
        .register("data.list", Arc::new(ListDataHandler::new(ctx.clone())))
        .await;
    registry
        .register("data.create", Arc::new(CreateDataHandler::new(ctx.clone())))
        .await;
    registry
        .register("data.update", Arc::new(UpdateDataHandler::new(ctx.clone())))
        .await;
    registry
        .register("data.delete", Arc::new(DeleteDataHandler::new(ctx)))
        .await;

    // System methods
    registry.register("ping", Arc::new(PingHandler)).await;
    registry
        .register("system.info", Arc::new(SystemInfoHandler))
        .await;
    registry
        .register(
            "system.methods",
            Arc::new(ListMethodsHandler::new(Arc::downgrade(registry))),
        )
        .await;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::methods::CallContext;
    use keeper_core::config::AuthConfig;
    use keeper_core::SecretString;
    use keeper_storage::Backends;
    use keeper_vault::Argon2Hasher;

    pub fn auth_config() -> AuthConfig {
        AuthConfig {
            token_secret: SecretString::new("gateway-test-signing-key"),
            token_ttl_secs: 3600,
        }
    }

    /// A vault over fresh in-memory stores with a cheap hasher.
    pub fn vault(backends: &Backends) -> Vault {
        let hasher = Argon2Hasher::with_params(1024, 1, 1).unwrap();
        Vault::with_hasher(backends, &auth_config(), Arc::new(hasher))
    }

    pub fn context() -> (Backends, Arc<HandlerContext>) {
        let backends = Backends::in_memory();
        let ctx = Arc::new(HandlerContext::new(vault(&backends)));
        (backends, ctx)
    }

    /// Register `username` and return a context acting as that user.
    pub async fn signed_in(ctx: &HandlerContext, username: &str) -> CallContext {
        let password = SecretString::new("pw1");
        ctx.vault.accounts.register(username, &password).await.unwrap();
        let token = ctx.vault.accounts.login(username, &password).await.unwrap();
        let caller = ctx
            .vault
            .guard
            .resolve(Some(&format!("Bearer {token}")))
            .await
            .unwrap();
        CallContext::authenticated(caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_methods() {
        assert!(is_public("auth.login"));
        assert!(is_public("ping"));
        assert!(!is_public("data.list"));
        assert!(!is_public("unknown"));
    }

    #[tokio::test]
    async fn test_register_all() {
        let (_backends, ctx) = testing::context();
        let registry = Arc::new(MethodRegistry::new());
        register_all(&registry, (*ctx).clone()).await;

        let names = registry.list().await;
        for name in [
            "auth.register",
            "auth.login",
            "data.get",
            "data.list",
            "data.create",
            "data.update",
            "data.delete",
            "ping",
        ] {
            assert!(names.iter().any(|n| n == name), "missing {name}");
        }
    }
}
