//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Common environment variable names.
pub mod vars {
    /// Keeper home directory override.
    pub const KEEPER_HOME: &str = "KEEPER_HOME";

    /// Keeper config file override.
    pub const KEEPER_CONFIG: &str = "KEEPER_CONFIG";

    /// Listen port override.
    pub const KEEPER_PORT: &str = "KEEPER_PORT";

    /// Metadata database URL override.
    pub const KEEPER_DATABASE_URL: &str = "KEEPER_DATABASE_URL";

    /// Object storage root override.
    pub const KEEPER_OBJECTS_ROOT: &str = "KEEPER_OBJECTS_ROOT";

    /// Object storage bucket override.
    pub const KEEPER_OBJECTS_BUCKET: &str = "KEEPER_OBJECTS_BUCKET";

    /// Token signing secret.
    pub const KEEPER_TOKEN_SECRET: &str = "KEEPER_TOKEN_SECRET";

    /// Log level override.
    pub const KEEPER_LOG_LEVEL: &str = "KEEPER_LOG_LEVEL";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_var_is_unset() {
        env::set_var("KEEPER_TEST_EMPTY", "");
        assert!(get_var("KEEPER_TEST_EMPTY").is_none());
        assert!(get_var("KEEPER_TEST_NONEXISTENT").is_none());
    }

    #[test]
    fn test_set_var_is_returned() {
        env::set_var("KEEPER_TEST_SET", "value");
        assert_eq!(get_var("KEEPER_TEST_SET").as_deref(), Some("value"));
    }
}
