//! HTTP gateway server.

use crate::error::GatewayError;
use crate::handlers::{self, is_public, HandlerContext};
use crate::methods::{CallContext, MethodRegistry};
use crate::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::Result;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use keeper_core::config::{BindMode, ServerConfig};
use keeper_vault::{AccessGuard, Vault};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Default gateway port.
pub const DEFAULT_PORT: u16 = 5050;

/// Default request body cap.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Origins allowed when CORS is enabled.
const ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://127.0.0.1",
    "https://localhost",
    "https://127.0.0.1",
];

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: BindMode,

    pub port: u16,

    /// Deadline for one RPC, including caller resolution.
    pub request_timeout: Duration,

    /// Enable CORS.
    pub cors: bool,

    /// Larger request bodies are refused with 413.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: BindMode::Loopback,
            port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(30),
            cors: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl From<&ServerConfig> for GatewayConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            bind: server.bind,
            port: server.port,
            request_timeout: Duration::from_secs(server.request_timeout_secs),
            cors: server.cors,
            max_body_bytes: server.max_body_bytes,
        }
    }
}

/// Gateway server state.
pub struct GatewayState {
    pub methods: Arc<MethodRegistry>,

    pub guard: Arc<AccessGuard>,

    pub config: GatewayConfig,
}

/// The JSON-RPC gateway server.
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Create a gateway with every Keeper method registered.
    pub async fn new(config: GatewayConfig, vault: Vault) -> Self {
        let methods = Arc::new(MethodRegistry::new());
        let guard = vault.guard.clone();
        handlers::register_all(&methods, HandlerContext::new(vault)).await;

        Self {
            state: Arc::new(GatewayState {
                methods,
                guard,
                config,
            }),
        }
    }

    /// Get the method registry for registering handlers.
    pub fn methods(&self) -> &Arc<MethodRegistry> {
        &self.state.methods
    }

    /// Get the bind address.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.state.config.bind.ip(), self.state.config.port)
    }

    /// Run until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let addr = self.bind_address();

        if self.state.config.bind != BindMode::Loopback {
            warn!("Gateway binding to {}, reachable from the network", addr);
        }

        let listener = TcpListener::bind(addr).await.map_err(GatewayError::Io)?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    ///
    /// In-flight requests are allowed to finish.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().map_err(GatewayError::Io)?;
        info!("Starting gateway server on {}", addr);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(GatewayError::Io)?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Create the Axum router.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/rpc", post(rpc_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
            .layer(DefaultBodyLimit::max(self.state.config.max_body_bytes))
            .layer(TraceLayer::new_for_http());

        if self.state.config.cors {
            router = router.layer(create_cors_layer());
        }

        router
    }
}

fn create_cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = ALLOWED_ORIGINS
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn rpc_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: String,
) -> Json<JsonRpcResponse> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    Json(handle_message(&body, &state, authorization).await)
}

/// Handle one JSON-RPC message.
///
/// Non-public methods resolve the bearer credential first; a missing or bad
/// credential fails the call before any handler runs.
pub async fn handle_message(
    text: &str,
    state: &GatewayState,
    authorization: Option<&str>,
) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            debug!("Unparseable RPC request: {}", e);
            return JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string()));
        }
    };

    let JsonRpcRequest {
        jsonrpc,
        id,
        method,
        params,
    } = request;
    if jsonrpc != JSONRPC_VERSION {
        return JsonRpcResponse::error(
            id,
            JsonRpcError::invalid_request(format!("unsupported jsonrpc version '{jsonrpc}'")),
        );
    }

    let started = Instant::now();
    let deadline = state.config.request_timeout;
    let outcome = match tokio::time::timeout(deadline, dispatch(state, &method, params, authorization))
        .await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(GatewayError::Timeout(deadline.as_secs())),
    };

    let response = match outcome {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, e.to_rpc_error()),
    };

    info!(
        method = %method,
        code = response.code(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "rpc"
    );
    response
}

async fn dispatch(
    state: &GatewayState,
    method: &str,
    params: Option<Value>,
    authorization: Option<&str>,
) -> Result<Value> {
    let ctx = if is_public(method) {
        CallContext::anonymous()
    } else {
        CallContext::authenticated(state.guard.resolve(authorization).await?)
    };
    state.methods.call(method, &ctx, params).await
}

/// Health check handler.
async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
