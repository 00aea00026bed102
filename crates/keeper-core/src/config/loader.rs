//! Configuration loading and persistence.

use super::{Config, LogLevel};
use crate::env::{self, vars};
use crate::error::ConfigError;
use crate::paths;
use crate::secret::SecretString;
use std::fs;
use std::path::{Path, PathBuf};

/// Minimum accepted length of the token signing key, in bytes.
pub const MIN_TOKEN_SECRET_LEN: usize = 16;

impl Config {
    /// Default config file location (`KEEPER_CONFIG`, else `~/.keeper/keeper.json5`).
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        match env::get_var(vars::KEEPER_CONFIG) {
            Some(path) => Ok(paths::expand_tilde(&path)),
            None => paths::config_file(),
        }
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    /// Environment overrides are applied either way.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to a JSON5-compatible string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // plain JSON is valid JSON5
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `KEEPER_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(raw) = env::get_var(vars::KEEPER_PORT) {
            self.server.port = raw
                .parse()
                .map_err(|_| ConfigError::Parse(format!("invalid KEEPER_PORT '{}'", raw)))?;
        }
        if let Some(url) = env::get_var(vars::KEEPER_DATABASE_URL) {
            self.database.url = Some(url);
        }
        if let Some(root) = env::get_var(vars::KEEPER_OBJECTS_ROOT) {
            self.objects.root = Some(PathBuf::from(root));
        }
        if let Some(bucket) = env::get_var(vars::KEEPER_OBJECTS_BUCKET) {
            self.objects.bucket = bucket;
        }
        if let Some(secret) = env::get_var(vars::KEEPER_TOKEN_SECRET) {
            self.auth.token_secret = SecretString::new(secret);
        }
        if let Some(level) = env::get_var(vars::KEEPER_LOG_LEVEL) {
            self.logging.level = level.parse::<LogLevel>()?;
        }
        Ok(())
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("Server port cannot be 0".to_string());
        }

        if self.server.request_timeout_secs == 0 {
            errors.push("Server request_timeout_secs must be greater than 0".to_string());
        }

        if self.server.max_body_bytes == 0 {
            errors.push("Server max_body_bytes must be greater than 0".to_string());
        }

        if self.database.max_connections == 0 {
            errors.push("Database max_connections must be greater than 0".to_string());
        }

        if self.objects.bucket.is_empty() || !crate::id::is_valid_object_id(&self.objects.bucket)
        {
            errors.push(format!(
                "Invalid objects bucket name '{}'",
                self.objects.bucket
            ));
        }

        if self.objects.prefix.is_empty()
            || self
                .objects
                .prefix
                .split('/')
                .any(|part| !crate::id::is_valid_object_id(part))
        {
            errors.push(format!(
                "Invalid objects prefix '{}'",
                self.objects.prefix
            ));
        }

        if self.auth.token_secret.is_empty() {
            errors.push("auth.token_secret must be set".to_string());
        } else if self.auth.token_secret.len() < MIN_TOKEN_SECRET_LEN {
            errors.push(format!(
                "auth.token_secret must be at least {} bytes",
                MIN_TOKEN_SECRET_LEN
            ));
        }

        if self.auth.token_ttl_secs == 0 {
            errors.push("auth.token_ttl_secs must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
