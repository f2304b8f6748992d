//! 健康检查 API 集成测试

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use video_catalog::config::TokenStrategy;

mod common;
use common::{create_test_app, send};

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app(TokenStrategy::Signed);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["uptime_secs"].is_number());
}

#[tokio::test]
async fn test_readiness_endpoint_memory_backend() {
    let (app, _) = create_test_app(TokenStrategy::Opaque);

    let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"][0]["name"], "store");
}

#[tokio::test]
async fn test_responses_carry_trace_headers() {
    use tower::ServiceExt;

    let (app, _) = create_test_app(TokenStrategy::Signed);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-trace-id", "trace-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-trace-id"], "trace-abc");
    assert!(response.headers().contains_key("x-request-id"));
}
