//! End-to-end adapter behavior against a fake application.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{Request, Response, StatusCode};
use lambda_gateway_adapter::{
    Adapter, AdapterConfig, App, BoxError, InvocationMetadata, LifespanMode,
};
use serde_json::{json, Value};

const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0xFF];

/// Small routed application standing in for the external collaborator.
#[derive(Default)]
struct RouterApp {
    startups: AtomicUsize,
    shutdowns: AtomicUsize,
    fail_startup: AtomicBool,
}

#[async_trait]
impl App for RouterApp {
    async fn call(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        match (request.method().as_str(), request.uri().path()) {
            ("GET", "/health") => Ok(Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "application/json")
                .body(Bytes::from_static(b"{\"status\":\"ok\"}"))?),
            ("GET", "/logo") => Ok(Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "image/png")
                .body(Bytes::from_static(PNG_BYTES))?),
            ("GET", "/tags") => Ok(Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "application/json")
                .header("x-tag", "a")
                .header("x-tag", "b")
                .header(SET_COOKIE, "session=abc")
                .body(Bytes::from_static(b"{}"))?),
            ("GET", "/batch-echo") => {
                let values: Vec<&str> = request
                    .headers()
                    .get_all("x-batch")
                    .iter()
                    .filter_map(|value| value.to_str().ok())
                    .collect();
                Ok(Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "text/plain")
                    .body(Bytes::from(values.join("|")))?)
            }
            ("GET", "/fail") => Err("downstream dependency unavailable".into()),
            ("GET", "/panic") => panic!("handler invariant violated"),
            _ => Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Bytes::new())?),
        }
    }

    async fn startup(&self) -> Result<(), BoxError> {
        self.startups.fetch_add(1, Ordering::SeqCst);
        if self.fail_startup.load(Ordering::SeqCst) {
            return Err("database unreachable".into());
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), BoxError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn adapter(lifespan: LifespanMode) -> Adapter<RouterApp> {
    Adapter::new(
        RouterApp::default(),
        AdapterConfig {
            lifespan,
            base_path: None,
        },
    )
}

fn metadata() -> InvocationMetadata {
    InvocationMetadata {
        request_id: "test-invocation".to_string(),
        ..InvocationMetadata::default()
    }
}

fn rest_event(method: &str, path: &str) -> Value {
    json!({
        "httpMethod": method,
        "path": path,
        "headers": {},
        "body": null
    })
}

fn http_api_event(method: &str, path: &str) -> Value {
    json!({
        "version": "2.0",
        "rawPath": path,
        "rawQueryString": "",
        "headers": {},
        "requestContext": {"http": {"method": method}},
        "body": null,
        "isBase64Encoded": false
    })
}

#[tokio::test]
async fn health_check_round_trip() {
    let adapter = adapter(LifespanMode::Off);

    let response = adapter.handle(rest_event("GET", "/health"), metadata()).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "{\"status\":\"ok\"}");
    assert!(!response.is_base64_encoded);
    assert_eq!(
        response.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
}

#[tokio::test]
async fn binary_bodies_round_trip_exactly() {
    let adapter = adapter(LifespanMode::Off);

    let response = adapter.handle(rest_event("GET", "/logo"), metadata()).await;

    assert!(response.is_base64_encoded);
    let decoded = BASE64.decode(&response.body).expect("valid base64 body");
    assert_eq!(decoded, PNG_BYTES);
}

#[tokio::test]
async fn application_error_becomes_500_and_environment_survives() {
    let adapter = adapter(LifespanMode::Off);

    let failed = adapter.handle(rest_event("GET", "/fail"), metadata()).await;
    assert_eq!(failed.status_code, 500);
    let body: Value = serde_json::from_str(&failed.body).expect("json error body");
    assert_eq!(body["error"], "internal_error");

    let recovered = adapter.handle(rest_event("GET", "/health"), metadata()).await;
    assert_eq!(recovered.status_code, 200);
}

#[tokio::test]
async fn application_panic_becomes_500_and_environment_survives() {
    let adapter = adapter(LifespanMode::Off);

    let panicked = adapter.handle(rest_event("GET", "/panic"), metadata()).await;
    assert_eq!(panicked.status_code, 500);

    let recovered = adapter.handle(rest_event("GET", "/health"), metadata()).await;
    assert_eq!(recovered.status_code, 200);
}

#[tokio::test]
async fn malformed_events_get_400_not_a_fault() {
    let adapter = adapter(LifespanMode::Off);

    let response = adapter
        .handle(json!({"detail": "not an http event"}), metadata())
        .await;

    assert_eq!(response.status_code, 400);
    let body: Value = serde_json::from_str(&response.body).expect("json error body");
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn repeated_request_headers_reach_the_application() {
    let adapter = adapter(LifespanMode::Off);
    let event = json!({
        "httpMethod": "GET",
        "path": "/batch-echo",
        "multiValueHeaders": {"x-batch": ["one", "two"]},
        "body": null
    });

    let response = adapter.handle(event, metadata()).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "one|two");
}

#[tokio::test]
async fn rest_responses_carry_repeated_headers_natively() {
    let adapter = adapter(LifespanMode::Off);

    let response = adapter.handle(rest_event("GET", "/tags"), metadata()).await;

    let multi = response.multi_value_headers.expect("multi value headers");
    assert_eq!(
        multi.get("x-tag"),
        Some(&vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(
        multi.get("set-cookie"),
        Some(&vec!["session=abc".to_string()])
    );
    assert!(response.cookies.is_none());
}

#[tokio::test]
async fn http_api_responses_join_headers_and_split_cookies() {
    let adapter = adapter(LifespanMode::Off);

    let response = adapter
        .handle(http_api_event("GET", "/tags"), metadata())
        .await;

    assert_eq!(response.headers.get("x-tag").map(String::as_str), Some("a,b"));
    assert_eq!(response.cookies, Some(vec!["session=abc".to_string()]));
    assert!(response.multi_value_headers.is_none());
    assert!(!response.headers.contains_key("set-cookie"));
}

#[tokio::test]
async fn off_mode_never_fires_lifecycle_hooks() {
    let adapter = adapter(LifespanMode::Off);

    adapter.handle(rest_event("GET", "/health"), metadata()).await;
    adapter.shutdown().await.expect("shutdown is a no-op");

    assert_eq!(adapter_app_startups(&adapter), 0);
}

#[tokio::test]
async fn startup_fires_once_for_a_warm_environment() {
    let adapter = adapter(LifespanMode::On);

    adapter.handle(rest_event("GET", "/health"), metadata()).await;
    adapter.handle(rest_event("GET", "/health"), metadata()).await;

    assert_eq!(adapter_app_startups(&adapter), 1);
}

#[tokio::test]
async fn failed_startup_answers_500_then_recovers_on_retry() {
    let app = RouterApp::default();
    app.fail_startup.store(true, Ordering::SeqCst);
    let adapter = Adapter::new(
        app,
        AdapterConfig {
            lifespan: LifespanMode::On,
            base_path: None,
        },
    );

    let refused = adapter.handle(rest_event("GET", "/health"), metadata()).await;
    assert_eq!(refused.status_code, 500);
    let body: Value = serde_json::from_str(&refused.body).expect("json error body");
    assert_eq!(body["error"], "startup_failed");

    adapter_app(&adapter).fail_startup.store(false, Ordering::SeqCst);
    let served = adapter.handle(rest_event("GET", "/health"), metadata()).await;
    assert_eq!(served.status_code, 200);
    assert_eq!(adapter_app_startups(&adapter), 2);
}

#[tokio::test]
async fn shutdown_fires_at_most_once() {
    let adapter = adapter(LifespanMode::Auto);

    adapter.handle(rest_event("GET", "/health"), metadata()).await;
    adapter.shutdown().await.expect("first shutdown");
    adapter.shutdown().await.expect("second shutdown");

    assert_eq!(adapter_app(&adapter).shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn base_path_prefix_is_stripped_before_the_application() {
    let adapter = Adapter::new(
        RouterApp::default(),
        AdapterConfig {
            lifespan: LifespanMode::Off,
            base_path: Some("/prod".to_string()),
        },
    );

    let response = adapter
        .handle(rest_event("GET", "/prod/health"), metadata())
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "{\"status\":\"ok\"}");
}

fn adapter_app(adapter: &Adapter<RouterApp>) -> &RouterApp {
    adapter.app()
}

fn adapter_app_startups(adapter: &Adapter<RouterApp>) -> usize {
    adapter_app(adapter).startups.load(Ordering::SeqCst)
}
