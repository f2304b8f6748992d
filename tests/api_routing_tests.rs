//! 路由匹配测试

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use video_catalog::config::TokenStrategy;

mod common;
use common::{authed_request, create_test_app, member_token, send};

#[tokio::test]
async fn test_unknown_path_is_404_without_token() {
    let (app, _) = create_test_app(TokenStrategy::Signed);

    let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 404);
    assert_eq!(body["error"]["message"], "Route not found");
}

#[tokio::test]
async fn test_unknown_path_is_404_with_token() {
    let (app, _) = create_test_app(TokenStrategy::Opaque);
    let token = member_token(&app, "m@x.com").await;

    let (status, _) = send(&app, authed_request("GET", "/videos/nope/extra", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsupported_method_is_405() {
    let (app, _) = create_test_app(TokenStrategy::Signed);
    let token = member_token(&app, "m@x.com").await;

    let (status, _) = send(&app, authed_request("GET", "/users/not-a-uuid", &token)).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
