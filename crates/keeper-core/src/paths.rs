//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the Keeper base directory (~/.keeper, or `KEEPER_HOME` when set).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = crate::env::get_var(crate::env::vars::KEEPER_HOME) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".keeper"))
}

/// Get the main config file path (~/.keeper/keeper.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("keeper.json5"))
}

/// Get the default SQLite database path (~/.keeper/keeper.db).
pub fn database_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("keeper.db"))
}

/// Get the default object storage root (~/.keeper/objects).
pub fn objects_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("objects"))
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
