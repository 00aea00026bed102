//! Configuration schema definitions.

use crate::error::ConfigError;
use crate::paths;
use crate::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Main Keeper configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// RPC server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Metadata database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Object storage settings.
    #[serde(default)]
    pub objects: ObjectsConfig,

    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// RPC server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind mode.
    #[serde(default)]
    pub bind: BindMode,

    /// Port number.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request deadline in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Allow cross-origin requests.
    #[serde(default)]
    pub cors: bool,

    /// Largest accepted request body in bytes. Binary payloads travel base64
    /// encoded, so the largest storable item is about three quarters of this.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: BindMode::default(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            cors: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_port() -> u16 {
    5050
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

/// Bind mode for the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Bind to loopback only (127.0.0.1).
    #[default]
    Loopback,

    /// Bind to all interfaces.
    Lan,
}

impl BindMode {
    pub fn ip(&self) -> IpAddr {
        match self {
            Self::Loopback => IpAddr::V4(Ipv4Addr::LOCALHOST),
            Self::Lan => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

/// Metadata database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL (`sqlite://...`) or plain file path. Defaults to `~/.keeper/keeper.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Resolve the configured location into a SQLite connection URL.
    pub fn resolved_url(&self) -> Result<String, ConfigError> {
        match self.url.as_deref() {
            Some(url) if url.starts_with("sqlite:") => Ok(url.to_string()),
            Some(path) => Ok(format!("sqlite://{}", paths::expand_tilde(path).display())),
            None => Ok(format!("sqlite://{}", paths::database_file()?.display())),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

/// Object storage backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectBackend {
    /// Directory-per-bucket on the local filesystem.
    #[default]
    Fs,

    /// Process memory; contents are lost on exit.
    Memory,
}

/// Object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectsConfig {
    /// Backend.
    #[serde(default)]
    pub backend: ObjectBackend,

    /// Directory holding buckets. Defaults to `~/.keeper/objects`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Key prefix for item payloads.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self {
            backend: ObjectBackend::default(),
            root: None,
            bucket: default_bucket(),
            prefix: default_prefix(),
        }
    }
}

impl ObjectsConfig {
    pub fn resolved_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.root {
            Some(root) => Ok(paths::expand_tilde(&root.to_string_lossy())),
            None => paths::objects_dir(),
        }
    }
}

fn default_bucket() -> String {
    "secrets".to_string()
}

fn default_prefix() -> String {
    "uploads".to_string()
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for bearer tokens.
    #[serde(default)]
    pub token_secret: SecretString,

    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: SecretString::default(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

fn default_token_ttl() -> u64 {
    24 * 60 * 60
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ConfigError::Parse(format!("unknown log level '{}'", other))),
        }
    }
}
