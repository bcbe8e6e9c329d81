// tests/providers_phantombuster.rs
// PhantomBuster client over real HTTP: container launch + fetch-output, and the direct endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use outreach_voice::acquire::poller::PollPolicy;
use outreach_voice::acquire::providers::phantombuster::PhantomBusterClient;
use outreach_voice::acquire::sources::{DirectSource, JobSource};
use outreach_voice::acquire::types::{AcquisitionRequest, FailureKind, ProfileSource};
use outreach_voice::config::PhantomBusterConfig;
use serde_json::{json, Value};

const REF: &str = "https://www.linkedin.com/in/grace-hopper";
const KEY: &str = "pb-test-key";

#[derive(Clone, Default)]
struct Calls {
    launches: Arc<AtomicU32>,
    fetches: Arc<AtomicU32>,
    direct: Arc<AtomicU32>,
}

fn key_ok(headers: &HeaderMap) -> bool {
    headers
        .get("x-phantombuster-key")
        .and_then(|v| v.to_str().ok())
        == Some(KEY)
}

async fn launch(State(c): State<Calls>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    c.launches.fetch_add(1, Ordering::SeqCst);
    if !key_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    assert_eq!(body["id"], "phantom-9");
    assert_eq!(body["argument"]["profileUrl"], REF);
    Json(json!({ "containerId": 4711 })).into_response()
}

async fn fetch_output(
    State(c): State<Calls>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    assert!(key_ok(&headers));
    assert_eq!(q.get("id").map(String::as_str), Some("4711"));
    match c.fetches.fetch_add(1, Ordering::SeqCst) {
        0 => Json(json!({ "status": "running" })).into_response(),
        // Some deployments answer 404 until the container has output.
        1 => StatusCode::NOT_FOUND.into_response(),
        _ => Json(json!({
            "status": "finished",
            "data": [{ "fullName": "Grace Hopper", "headline": "Rear Admiral", "lastPost": "COBOL turns 65" }]
        }))
        .into_response(),
    }
}

async fn direct_ok(State(c): State<Calls>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    c.direct.fetch_add(1, Ordering::SeqCst);
    assert!(key_ok(&headers));
    assert_eq!(body["url"], REF);
    Json(json!({ "fullName": "Grace Hopper", "headline": "Rear Admiral" })).into_response()
}

async fn direct_forbidden(State(c): State<Calls>) -> Response {
    c.direct.fetch_add(1, Ordering::SeqCst);
    StatusCode::FORBIDDEN.into_response()
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: String) -> PhantomBusterClient {
    let cfg = PhantomBusterConfig {
        base_url,
        api_key: Some(KEY.into()),
        phantom_id: Some("phantom-9".into()),
        ..PhantomBusterConfig::default()
    };
    PhantomBusterClient::new(&cfg, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn container_output_with_inline_rows_succeeds() {
    let calls = Calls::default();
    let base = serve(
        Router::new()
            .route("/phantoms/launch", post(launch))
            .route("/containers/fetch-output", get(fetch_output))
            .with_state(calls.clone()),
    )
    .await;
    let source = JobSource::new(
        "phantombuster",
        client(base),
        PollPolicy::new(Duration::from_millis(10), 5),
    );

    let rec = source
        .attempt_acquire(&AcquisitionRequest::new(REF))
        .await
        .expect("container should finish on the third check");

    assert_eq!(rec.full_name(), "Grace Hopper");
    assert_eq!(rec.headline(), "Rear Admiral");
    assert_eq!(rec.recent_post_text(), "COBOL turns 65");
    assert_eq!(calls.launches.load(Ordering::SeqCst), 1);
    assert_eq!(calls.fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn container_without_output_times_out() {
    let calls = Calls::default();
    let base = serve(
        Router::new()
            .route("/phantoms/launch", post(launch))
            .route(
                "/containers/fetch-output",
                get(|| async { Json(json!({ "status": "running" })) }),
            )
            .with_state(calls.clone()),
    )
    .await;
    let source = JobSource::new(
        "phantombuster",
        client(base),
        PollPolicy::new(Duration::from_millis(5), 4),
    );

    let err = source
        .attempt_acquire(&AcquisitionRequest::new(REF))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::TimedOut);
    assert!(err.message.contains("after 4 polls"), "{}", err.message);
}

#[tokio::test]
async fn rejected_launch_is_a_transport_failure() {
    let calls = Calls::default();
    let base = serve(
        Router::new()
            .route("/phantoms/launch", post(|| async { StatusCode::PAYMENT_REQUIRED }))
            .with_state(calls.clone()),
    )
    .await;
    let source = JobSource::new(
        "phantombuster",
        client(base),
        PollPolicy::new(Duration::from_millis(5), 4),
    );

    let err = source
        .attempt_acquire(&AcquisitionRequest::new(REF))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Transport);
    assert!(err.message.contains("402"), "{}", err.message);
}

#[tokio::test]
async fn direct_endpoint_success_and_rejection() {
    let calls = Calls::default();
    let base = serve(
        Router::new()
            .route("/linkedin/profile", post(direct_ok))
            .with_state(calls.clone()),
    )
    .await;
    let rec = DirectSource::new("phantombuster-direct", client(base))
        .attempt_acquire(&AcquisitionRequest::new(REF))
        .await
        .unwrap();
    assert_eq!(rec.full_name(), "Grace Hopper");
    assert_eq!(calls.direct.load(Ordering::SeqCst), 1);

    let base = serve(
        Router::new()
            .route("/linkedin/profile", post(direct_forbidden))
            .with_state(calls.clone()),
    )
    .await;
    let err = DirectSource::new("phantombuster-direct", client(base))
        .attempt_acquire(&AcquisitionRequest::new(REF))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Transport);
    assert_eq!(err.message, "HTTP 403");
    assert_eq!(calls.direct.load(Ordering::SeqCst), 2);
}
