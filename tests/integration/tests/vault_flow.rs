//! End-to-end RPC flows through the gateway router.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keeper_core::types::ItemFilter;
use keeper_core::Config;
use keeper_integration_tests::TestServer;
use keeper_storage::{Backends, ObjectStore};
use serde_json::json;

#[tokio::test]
async fn test_register_login_and_text_roundtrip() {
    let server = TestServer::in_memory().await;
    let token = server.sign_up("alice", "pw1").await;

    let created = server
        .ok(
            "data.create",
            json!({"item": {"id": "a1", "type": "text", "data": STANDARD.encode("hello")}}),
            Some(&token),
        )
        .await;
    assert_eq!(created["id"], "a1");

    let got = server.ok("data.get", json!({"id": "a1"}), Some(&token)).await;
    assert_eq!(got["found"], true);
    assert_eq!(got["items"][0]["id"], "a1");
    assert_eq!(got["items"][0]["type"], "text");
    assert_eq!(got["items"][0]["data"], STANDARD.encode("hello"));

    // inline payloads never touch the object store
    let object = server
        .backends
        .objects
        .get_file(&ItemFilter::by_id("a1"))
        .await
        .unwrap();
    assert!(object.is_none());
}

#[tokio::test]
async fn test_binary_lifecycle() {
    let server = TestServer::in_memory().await;
    let token = server.sign_up("alice", "pw1").await;
    let payload = [0xDE, 0xAD, 0xBE, 0xEF];

    server
        .ok(
            "data.create",
            json!({"item": {"id": "b1", "type": "binary", "data": STANDARD.encode(payload)}}),
            Some(&token),
        )
        .await;
    let object = server
        .backends
        .objects
        .get_file(&ItemFilter::by_id("b1"))
        .await
        .unwrap();
    assert_eq!(object.as_deref(), Some(&payload[..]));

    let got = server.ok("data.get", json!({"id": "b1"}), Some(&token)).await;
    assert_eq!(got["items"][0]["data"], STANDARD.encode(payload));
    assert!(!got["items"][0]["url"].as_str().unwrap().is_empty());

    server
        .ok(
            "data.update",
            json!({"item": {"id": "b1", "data": STANDARD.encode([1u8, 2, 3])}}),
            Some(&token),
        )
        .await;
    let got = server.ok("data.get", json!({"id": "b1"}), Some(&token)).await;
    assert_eq!(got["items"][0]["data"], STANDARD.encode([1u8, 2, 3]));

    server.ok("data.delete", json!({"id": "b1"}), Some(&token)).await;
    let got = server.ok("data.get", json!({"id": "b1"}), Some(&token)).await;
    assert_eq!(got["found"], false);
    let object = server
        .backends
        .objects
        .get_file(&ItemFilter::by_id("b1"))
        .await
        .unwrap();
    assert!(object.is_none());
}

#[tokio::test]
async fn test_users_cannot_see_each_other() {
    let server = TestServer::in_memory().await;
    let alice = server.sign_up("alice", "pw1").await;
    let bob = server.sign_up("bob", "pw2").await;

    for (id, token) in [("a1", &alice), ("a2", &alice), ("b1", &bob)] {
        server
            .ok(
                "data.create",
                json!({"item": {"id": id, "type": "credentials", "data": STANDARD.encode(id)}}),
                Some(token),
            )
            .await;
    }

    let listed = server.ok("data.list", json!({}), Some(&alice)).await;
    let ids: Vec<&str> = listed["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a1", "a2"]);

    let listed = server
        .ok("data.list", json!({"ids": ["b1"], "owner_id": "anyone"}), Some(&alice))
        .await;
    assert_eq!(listed["items"], json!([]));

    let got = server.ok("data.get", json!({"id": "b1"}), Some(&alice)).await;
    assert_eq!(got["found"], false);

    let error = server.err("data.delete", json!({"id": "b1"}), Some(&alice)).await;
    assert_eq!(error["data"]["kind"], "record_not_found");

    // bob's item survived
    let got = server.ok("data.get", json!({"id": "b1"}), Some(&bob)).await;
    assert_eq!(got["found"], true);
}

#[tokio::test]
async fn test_account_errors() {
    let server = TestServer::in_memory().await;
    server.sign_up("alice", "pw1").await;

    let error = server
        .err("auth.register", json!({"username": "alice", "password": "pw2"}), None)
        .await;
    assert_eq!(error["data"]["kind"], "username_already_exists");

    let error = server
        .err("auth.login", json!({"username": "alice", "password": "wrongpw"}), None)
        .await;
    assert_eq!(error["data"]["kind"], "invalid_password");

    let error = server
        .err("auth.login", json!({"username": "nobody", "password": "pw"}), None)
        .await;
    assert_eq!(error["data"]["kind"], "user_not_found");
}

#[tokio::test]
async fn test_unauthenticated_calls_rejected() {
    let server = TestServer::in_memory().await;

    for method in ["data.get", "data.list", "data.create", "data.update", "data.delete"] {
        let error = server.err(method, json!({"id": "a1"}), None).await;
        assert_eq!(error["code"], -32001, "{method}");

        let error = server.err(method, json!({"id": "a1"}), Some("not-a-token")).await;
        assert_eq!(error["code"], -32001, "{method}");
    }

    let pong = server.ok("ping", json!({}), None).await;
    assert_eq!(pong["pong"], true);
}

#[tokio::test]
async fn test_persistent_backends() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.database.url = Some(format!(
        "sqlite://{}",
        dir.path().join("keeper.db").display()
    ));
    config.objects.root = Some(dir.path().join("objects"));

    let server = TestServer::with_backends(Backends::open(&config).await.unwrap()).await;
    let token = server.sign_up("alice", "pw1").await;
    server
        .ok(
            "data.create",
            json!({"item": {"id": "b1", "type": "binary", "data": STANDARD.encode([9u8; 16]), "meta": "key file"}}),
            Some(&token),
        )
        .await;

    // a second process over the same files sees the same data
    let reopened = TestServer::with_backends(Backends::open(&config).await.unwrap()).await;
    let result = reopened
        .ok("auth.login", json!({"username": "alice", "password": "pw1"}), None)
        .await;
    let token = result["token"].as_str().unwrap();

    let got = reopened.ok("data.get", json!({"id": "b1"}), Some(token)).await;
    assert_eq!(got["items"][0]["meta"], "key file");
    assert_eq!(got["items"][0]["data"], STANDARD.encode([9u8; 16]));
}
