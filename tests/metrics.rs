// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use outreach_voice::metrics::Metrics;
use std::io::Write;
use tower::ServiceExt;

// Sources without credentials: every attempt is a skip, no network involved.
fn offline_config(audio_dir: &std::path::Path) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(
        f,
        r#"
        [server]
        public_base_url = "http://test.local"
        audio_dir = "{}"

        [acquisition]
        sources = ["apify-sync", "phantombuster-direct"]
        "#,
        audio_dir.display().to_string().replace('\\', "/")
    )
    .unwrap();
    f
}

#[tokio::test]
async fn metrics_endpoint_contains_pipeline_series() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = offline_config(tmp.path());
    std::env::set_var("OUTREACH_CONFIG_PATH", cfg.path());
    std::env::set_var("OUTREACH_TEST_MODE", "mock");
    std::env::remove_var("APIFY_API_TOKEN");
    std::env::remove_var("PHANTOMBUSTER_API_KEY");

    let metrics = Metrics::init().expect("install recorder");
    let app = outreach_voice::app()
        .await
        .expect("app() should build Router in tests")
        .merge(metrics.router());

    let resp = app
        .clone()
        .oneshot(
            Request::post("/api/outreach")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"linkedinProfile":"https://www.linkedin.com/in/someone"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["debug"]["strategy"], "fallback");
    assert!(json["audioUrl"]
        .as_str()
        .unwrap()
        .starts_with("http://test.local/audio/"));

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8_lossy(&body);

    for series in [
        "acquire_attempts_total",
        "acquire_fallback_total",
        "pipeline_degraded_total",
        "pipeline_run_ms",
    ] {
        assert!(text.contains(series), "missing {series} in:\n{text}");
    }
    assert!(text.contains(r#"outcome="not_configured""#));
    assert!(text.contains(r#"stage="acquire""#));
}
