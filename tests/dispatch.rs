//! From a mock tree on disk to dispatched responses.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use common::MockTree;
use route_mock::dispatch::{
    handler_fn, Dispatch, HandlerError, MockRequest, MockResponse, Pipeline, Registry,
    ResponseBody, X_RESPONSE_TIME,
};
use route_mock::scan::FsModuleLoader;
use serde_json::{json, Value};

async fn call(pipeline: &Pipeline, method: Method, uri: &str) -> MockResponse {
    match pipeline.dispatch(MockRequest::new(method, uri)).await.unwrap() {
        Dispatch::Matched(res) => res,
        Dispatch::NotFound => panic!("{uri} did not match"),
    }
}

fn json_body(res: &MockResponse) -> &Value {
    match &res.body {
        ResponseBody::Json(value) => value,
        other => panic!("expected json body, got {other:?}"),
    }
}

#[tokio::test]
async fn test_most_specific_route_answers() {
    let tree = MockTree::new();
    tree.write("users/profile.get.json", r#"{"who": "me"}"#)
        .write("users/[id].get.json", r#"{"handler": "echo"}"#)
        .write("users/[id]/posts.get.json", r#"[]"#)
        .write("docs/[[...slug]].get.json", r#"{"handler": "echo"}"#)
        .write("(marketing)/about.get.json", r#""about us""#);

    let (pipeline, diagnostics) = tree.scanner().build().unwrap();
    assert!(diagnostics.is_empty());

    let res = call(&pipeline, Method::GET, "/users/profile").await;
    assert_eq!(json_body(&res), &json!({"who": "me"}));

    let res = call(&pipeline, Method::GET, "/users/7").await;
    assert_eq!(json_body(&res)["params"], json!({"id": "7"}));

    let res = call(&pipeline, Method::GET, "/users/7/posts").await;
    assert_eq!(json_body(&res), &json!([]));

    let res = call(&pipeline, Method::GET, "/docs").await;
    assert_eq!(json_body(&res)["params"], json!({}));
    let res = call(&pipeline, Method::GET, "/docs/guide/intro").await;
    assert_eq!(json_body(&res)["params"], json!({"slug": "guide/intro"}));

    let res = call(&pipeline, Method::GET, "/about").await;
    assert_eq!(res.body, ResponseBody::Text("about us".to_string()));

    assert!(matches!(
        pipeline
            .dispatch(MockRequest::new(Method::POST, "/users/7"))
            .await
            .unwrap(),
        Dispatch::NotFound
    ));
}

#[tokio::test]
async fn test_config_middleware_runs_in_lanes() {
    let tree = MockTree::new();
    tree.write(
        "index.config.json",
        r#"{"middleware": [{"phase": "post", "handler": "timing"}, {"handler": "cors"}]}"#,
    )
    .write("api/index.config.json", r#"{"delay": 120}"#)
    .write("api/slow.get.json", r#"{"ok": true}"#);

    let (pipeline, _) = tree.scanner().build().unwrap();
    let started = Instant::now();
    let res = call(&pipeline, Method::GET, "/api/slow").await;
    assert!(started.elapsed() >= Duration::from_millis(120));

    assert_eq!(res.headers["access-control-allow-origin"], "*");
    let timing = res.headers[X_RESPONSE_TIME].to_str().unwrap();
    let ms: u64 = timing.trim_end_matches("ms").parse().unwrap();
    assert!(ms >= 120, "timing header {timing} should include the delay");
}

#[tokio::test]
async fn test_handler_errors_surface_unless_caught() {
    let tree = MockTree::new();
    tree.write("fails.get.json", r#"{"handler": "boom"}"#)
        .write(
            "guarded/index.config.json",
            r#"{"middleware": [{"phase": "pre", "handler": "catch-errors"}]}"#,
        )
        .write("guarded/fails.get.json", r#"{"handler": "boom"}"#);

    let registry = Registry::with_builtins().with_handler(
        "boom",
        handler_fn(|_req| Err(HandlerError::msg("database unavailable"))),
    );
    let scanner = tree.scanner_with(Arc::new(FsModuleLoader), registry);
    let (pipeline, diagnostics) = scanner.build().unwrap();
    assert!(diagnostics.is_empty());

    let err = pipeline
        .dispatch(MockRequest::new(Method::GET, "/fails"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "database unavailable");

    let res = call(&pipeline, Method::GET, "/guarded/fails").await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&res), &json!({"error": "database unavailable"}));
}

#[tokio::test]
async fn test_status_and_headers_prefill_handler_response() {
    let tree = MockTree::new();
    tree.write("index.config.json", r#"{"headers": {"Cache-Control": "no-store"}}"#)
        .write(
            "orders.post.json",
            r#"{"handler": "echo", "status": 201, "headers": {"Location": "/orders/1"}}"#,
        );

    let (pipeline, _) = tree.scanner().build().unwrap();
    let req = MockRequest::new(Method::POST, "/orders").with_body(r#"{"sku": "A-1"}"#);
    let Dispatch::Matched(res) = pipeline.dispatch(req).await.unwrap() else {
        panic!("expected a match");
    };
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.headers["cache-control"], "no-store");
    assert_eq!(res.headers["location"], "/orders/1");
    assert_eq!(json_body(&res)["body"], json!({"sku": "A-1"}));
}

#[tokio::test]
async fn test_programmatic_handler_reads_params_and_headers() {
    let tree = MockTree::new();
    tree.write("accounts/[account].get.json", r#"{"handler": "account"}"#);

    let registry = Registry::with_builtins().with_handler(
        "account",
        handler_fn(|req| {
            let tenant = req
                .headers
                .get("x-tenant")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| HandlerError::msg("missing tenant"))?;
            Ok(json!({"account": req.param("account"), "tenant": tenant}))
        }),
    );
    let scanner = tree.scanner_with(Arc::new(FsModuleLoader), registry);
    let (pipeline, _) = scanner.build().unwrap();

    let req = MockRequest::new(Method::GET, "/accounts/acme").with_header(
        HeaderName::from_static("x-tenant"),
        HeaderValue::from_static("eu-1"),
    );
    let Dispatch::Matched(res) = pipeline.dispatch(req).await.unwrap() else {
        panic!("expected a match");
    };
    assert_eq!(json_body(&res), &json!({"account": "acme", "tenant": "eu-1"}));

    let err = pipeline
        .dispatch(MockRequest::new(Method::GET, "/accounts/acme"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "missing tenant");
}
