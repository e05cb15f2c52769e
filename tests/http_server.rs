//! The standalone server over real sockets.

mod common;

use std::sync::Arc;

use common::{spawn_server, MockTree};
use route_mock::config::{NotFoundMode, ServerConfig};
use route_mock::dispatch::{handler_fn, HandlerError, Registry};
use route_mock::manifest::ManifestStore;
use route_mock::scan::FsModuleLoader;
use serde_json::{json, Value};

#[tokio::test]
async fn test_serves_matched_routes_and_json_404() {
    let tree = MockTree::new();
    tree.write("index.config.json", r#"{"headers": {"X-Mock": "route-mock"}}"#)
        .write("users/[id].get.json", r#"{"handler": "echo"}"#)
        .write("teapot.get.json", r#"{"response": "short and stout", "status": 418}"#);

    let server = spawn_server(tree.store(), ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/users/42?fields=name")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-mock"], "route-mock");
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["params"]["id"], "42");
    assert_eq!(body["query"]["fields"], "name");

    let res = client.get(server.url("/teapot")).send().await.unwrap();
    assert_eq!(res.status(), 418);
    assert_eq!(res.text().await.unwrap(), "short and stout");

    let res = client.delete(server.url("/users/42")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["method"], "DELETE");
    assert_eq!(body["path"], "/users/42");

    server.stop().await;
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let tree = MockTree::new();
    tree.write("ping.get.json", r#""pong""#);

    let server = spawn_server(tree.store(), ServerConfig::default()).await;
    let res = reqwest::Client::new()
        .get(server.url("/ping"))
        .header("x-request-id", "trace-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-123");

    server.stop().await;
}

#[tokio::test]
async fn test_pass_mode_leaves_unmatched_requests_alone() {
    let tree = MockTree::new();
    tree.write("ping.get.json", r#""pong""#);

    let config = ServerConfig {
        not_found: NotFoundMode::Pass,
        ..ServerConfig::default()
    };
    let server = spawn_server(tree.store(), config).await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/ping")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "pong");

    let res = client.get(server.url("/elsewhere")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert!(res.text().await.unwrap().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_published_manifest_is_served_immediately() {
    let tree = MockTree::new();
    tree.write("v1.get.json", "1");
    let store = tree.store();

    let server = spawn_server(store.clone(), ServerConfig::default()).await;
    let client = reqwest::Client::new();
    assert_eq!(client.get(server.url("/v2")).send().await.unwrap().status(), 404);

    tree.write("v2.get.json", "2");
    let (pipeline, _) = tree.scanner().build().unwrap();
    let previous = store.publish(pipeline);
    assert_eq!(previous.manifest().routes.len(), 1);

    let res = client.get(server.url("/v2")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "2");

    server.stop().await;
}

#[tokio::test]
async fn test_handler_failure_and_body_limit() {
    let tree = MockTree::new();
    tree.write("fails.get.json", r#"{"handler": "boom"}"#)
        .write("upload.post.json", r#"{"handler": "echo"}"#);

    let registry = Registry::with_builtins()
        .with_handler("boom", handler_fn(|_req| Err(HandlerError::msg("nope"))));
    let scanner = tree.scanner_with(Arc::new(FsModuleLoader), registry);
    let (pipeline, _) = scanner.build().unwrap();

    let config = ServerConfig {
        max_body_bytes: 64,
        ..ServerConfig::default()
    };
    let server = spawn_server(ManifestStore::new(pipeline), config).await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/fails")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "nope"}));

    let res = client
        .post(server.url("/upload"))
        .body(r#"{"small": true}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .post(server.url("/upload"))
        .body("x".repeat(1024))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);

    server.stop().await;
}
