//! Router-level tests against an in-memory store.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use spanwatch::http::router;
use spanwatch::{Observability, ServiceSettings};
use spanwatch_core::model::dependency::DependencyEdge;
use spanwatch_core::model::span::SpanRecord;
use spanwatch_core::model::trace::TraceRecord;
use spanwatch_store::Store;
use tower::ServiceExt;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
}

fn app() -> Router {
    let store = Store::open_in_memory().unwrap();
    store.load(&testkit::sample_dataset(now())).unwrap();
    router(Observability::new(store, ServiceSettings::default()).with_fixed_now(now()))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn healthz_is_plain_ok() {
    let response = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn services_list_defaults_to_one_hour() {
    let (status, body) = get(app(), "/api/services/list").await;
    assert_eq!(status, StatusCode::OK);

    let services = body.as_array().unwrap();
    assert_eq!(services.len(), 4);
    assert_eq!(services[0]["service_name"], "checkout");
    assert_eq!(services[0]["health_status"], "critical");
    assert!(services[0]["current"]["latency_p95"].is_f64());
}

#[tokio::test]
async fn unknown_time_range_is_bad_request() {
    let (status, body) = get(app(), "/api/dependencies/graph?time_range=1w").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");
    assert!(body["message"].as_str().unwrap().contains("1w"));
}

#[tokio::test]
async fn service_metrics_carry_trend_and_baseline() {
    let (status, body) = get(app(), "/api/services/checkout/metrics?time_range=1h").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service_name"], "checkout");
    assert_eq!(
        body["trends"].as_array().unwrap().len(),
        testkit::TRACES_PER_WINDOW
    );
    assert!(body["baseline"]["request_count"].is_i64());
}

#[tokio::test]
async fn silent_service_is_not_found() {
    let (status, body) = get(app(), "/api/services/search/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn graph_uses_camel_case_fields() {
    let (status, body) = get(app(), "/api/dependencies/graph").await;
    assert_eq!(status, StatusCode::OK);

    let node = &body["nodes"][0];
    assert!(node.get("errorRate").is_some());
    assert!(node.get("requestCount").is_some());
    let edge = &body["edges"][0];
    assert_eq!(edge["source"], "frontend");
    assert_eq!(edge["target"], "checkout");
    assert_eq!(edge["callCount"], 120);
}

#[tokio::test]
async fn dependencies_report_unknown_neighbours() {
    let (status, body) = get(app(), "/api/services/inventory/dependencies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outbound"].as_array().unwrap().len(), 0);
    assert_eq!(body["inbound"][1]["service_name"], "search");
    assert_eq!(body["inbound"][1]["health_status"], "unknown");
}

#[tokio::test]
async fn traces_by_service_and_detail() {
    let (status, body) = get(app(), "/api/services/payments/traces?time_range=24h").await;
    assert_eq!(status, StatusCode::OK);
    let traces = body.as_array().unwrap();
    assert_eq!(traces.len(), 2 * testkit::TRACES_PER_WINDOW);
    assert_eq!(traces[0]["trace_id"], testkit::SAMPLE_TRACE_ID);

    let uri = format!("/api/traces/{}", testkit::SAMPLE_TRACE_ID);
    let (status, body) = get(app(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["spans"][0]["service_name"], "checkout");
    assert_eq!(body["spans"][0]["total_duration_ms"], 450.0);
}

#[tokio::test]
async fn quoted_service_names_are_data() {
    let (status, body) = get(app(), "/api/services/x'%20OR%20'1'='1/traces").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = get(app(), "/api/traces/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn service_named_traces_reaches_service_routes() {
    let mut dataset = testkit::sample_dataset(now());
    dataset.traces.push(TraceRecord {
        trace_id: "trace-route-clash".into(),
        trace_start: now() - chrono::Duration::minutes(3),
        total_duration_ms: 12.0,
        span_count: 1,
    });
    dataset.spans.push(SpanRecord {
        trace_id: "trace-route-clash".into(),
        span_id: "s1".into(),
        service_name: "traces".into(),
        duration_ms: 12.0,
        is_error: false,
    });
    dataset
        .dependencies
        .push(DependencyEdge::new("frontend", "traces", 7));

    let store = Store::open_in_memory().unwrap();
    store.load(&dataset).unwrap();
    let app = router(Observability::new(store, ServiceSettings::default()).with_fixed_now(now()));

    let (status, body) = get(app.clone(), "/api/services/traces/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service_name"], "traces");
    assert_eq!(body["current"]["request_count"], 1);

    let (status, body) = get(app.clone(), "/api/services/traces/dependencies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inbound"][0]["service_name"], "frontend");
    assert_eq!(body["inbound"][0]["call_count"], 7);

    let (status, body) = get(app.clone(), "/api/services/traces/traces").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["trace_id"], "trace-route-clash");

    let (status, body) = get(app, "/api/traces/trace-route-clash").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["spans"][0]["service_name"], "traces");
}

#[tokio::test]
async fn store_info_reports_counts() {
    let (status, body) = get(app(), "/api/store/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["engine"], "duckdb");
    assert_eq!(body["traces"], 2 * testkit::TRACES_PER_WINDOW as i64 + 1);
    assert!(body["newest_trace"].is_string());
}

#[tokio::test]
async fn concurrent_requests_share_one_store() {
    let app = app();
    let mut tasks = Vec::new();
    for i in 0..32 {
        let app = app.clone();
        let uri = match i % 4 {
            0 => "/api/services/list",
            1 => "/api/dependencies/graph",
            2 => "/api/traces?time_range=24h",
            _ => "/api/services/checkout/dependencies",
        };
        tasks.push(tokio::spawn(async move { get(app, uri).await.0 }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }
}
