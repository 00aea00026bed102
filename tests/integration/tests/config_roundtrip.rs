//! Config save/load roundtrip integration tests.

use keeper_core::config::{BindMode, Config};
use keeper_core::SecretString;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keeper.json5");

    let mut config = Config::default();
    config.server.bind = BindMode::Lan;
    config.server.port = 9090;
    config.objects.bucket = "vault".to_string();
    config.auth.token_secret = SecretString::new("roundtrip-signing-key");
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.server.port, 9090);
    assert_eq!(loaded.server.bind, BindMode::Lan);
    assert_eq!(loaded.objects.bucket, "vault");
    assert_eq!(loaded.auth.token_ttl_secs, config.auth.token_ttl_secs);
    assert_eq!(loaded.auth.token_secret.expose_secret(), "roundtrip-signing-key");
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_config_json5_syntax() {
    let config = Config::parse(
        r#"{
            // comments and trailing commas are allowed
            server: { port: 6060, },
            auth: { token_secret: "0123456789abcdef", token_ttl_secs: 60 },
        }"#,
    )
    .unwrap();
    assert_eq!(config.server.port, 6060);
    assert_eq!(config.auth.token_ttl_secs, 60);
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/keeper.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}
