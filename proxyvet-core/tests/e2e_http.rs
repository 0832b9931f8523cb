//! Drives the reqwest-backed pipeline through a local axum server that
//! plays the role of an HTTP forward proxy.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode, Uri},
    routing::get,
};
use proxyvet_core::{
    domain::{Endpoint, RuleSpec},
    validation::{PipelineSettings, ReqwestConnector, Validator},
};
use serde_json::{Value, json};
use url::Url;

type Seen = Arc<Mutex<Vec<String>>>;

async fn echo() -> Json<Value> {
    Json(json!({ "origin": "127.0.0.1" }))
}

async fn slow_echo() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "origin": "127.0.0.1" }))
}

async fn unhandled(
    State(seen): State<Seen>,
    method: Method,
    uri: Uri,
) -> StatusCode {
    seen.lock()
        .expect("seen lock")
        .push(format!("{method} {uri}"));
    StatusCode::BAD_GATEWAY
}

async fn spawn_proxy() -> (SocketAddr, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/get", get(echo))
        .route("/slow", get(slow_echo))
        .route("/hello", get(|| async { "hello world" }))
        .route("/bye", get(|| async { "goodbye" }))
        .fallback(unhandled)
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind proxy listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("proxy server");
    });

    (addr, seen)
}

fn url(raw: &str) -> Url {
    Url::parse(raw).expect("valid url")
}

fn validator(echo_url: &str, rules: Vec<RuleSpec>) -> Validator {
    let connector = ReqwestConnector::new(Duration::from_millis(500));
    let settings = PipelineSettings {
        echo_url: url(echo_url),
        rules,
    };
    Validator::new(Arc::new(connector), settings).expect("validator")
}

fn tunnel_attempted(seen: &Seen) -> bool {
    seen.lock()
        .expect("seen lock")
        .iter()
        .any(|line| line.starts_with("CONNECT "))
}

#[tokio::test]
async fn echo_through_proxy_sets_http_ok_and_latency() {
    let (addr, seen) = spawn_proxy().await;
    let endpoint = Endpoint::parse(&addr.to_string()).expect("endpoint");

    let entry = validator("http://echo.test/get", Vec::new())
        .validate(&endpoint)
        .await;

    assert!(entry.http_ok);
    let latency = entry.latency.expect("latency recorded");
    assert!(latency > Duration::ZERO);
    // the stub proxy refuses CONNECT, so the secure echo fails
    assert!(!entry.https_ok);
    assert!(tunnel_attempted(&seen));
}

#[tokio::test]
async fn echo_timeout_still_evaluates_https() {
    let (addr, seen) = spawn_proxy().await;
    let endpoint = Endpoint::parse(&addr.to_string()).expect("endpoint");

    let entry = validator("http://echo.test/slow", Vec::new())
        .validate(&endpoint)
        .await;

    assert!(!entry.http_ok);
    assert!(entry.latency.is_none());
    assert!(!entry.https_ok);
    assert!(tunnel_attempted(&seen), "https stage must run after an http timeout");
}

#[tokio::test]
async fn content_rules_through_proxy() {
    let (addr, _seen) = spawn_proxy().await;
    let endpoint = Endpoint::parse(&addr.to_string()).expect("endpoint");
    let rules = vec![
        RuleSpec::new("hello", url("http://rules.test/hello")).with_contains("hello"),
        RuleSpec::new("bye", url("http://rules.test/bye")).with_contains("hello"),
    ];

    let entry = validator("http://echo.test/get", rules)
        .validate(&endpoint)
        .await;

    assert_eq!(entry.rule_results.get("hello"), Some(&true));
    assert_eq!(entry.rule_results.get("bye"), Some(&false));
}

#[tokio::test]
async fn dead_endpoint_fails_every_stage() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let endpoint = Endpoint::parse(&addr.to_string()).expect("endpoint");

    let entry = validator(
        "http://echo.test/get",
        vec![RuleSpec::new("hello", url("http://rules.test/hello"))],
    )
    .validate(&endpoint)
    .await;

    assert!(!entry.http_ok);
    assert!(!entry.https_ok);
    assert_eq!(entry.rule_results.get("hello"), Some(&false));
}
