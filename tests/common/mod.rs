//! 测试公共模块
//! 提供测试辅助函数和测试工具（基于内存存储，无需外部数据库）

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use video_catalog::{
    config::{
        AdminSeedConfig, AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig,
        StorageBackend, TokenStrategy,
    },
    middleware::AppState,
    repository::Stores,
    routes,
};

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-min-32-chars";

/// 创建测试配置
pub fn create_test_config(strategy: TokenStrategy) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
            cors_allowed_origins: None,
        },
        database: DatabaseConfig {
            backend: StorageBackend::Memory,
            url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            secret_key: Secret::new(TEST_SECRET.to_string()),
            token_strategy: strategy,
            token_ttl_secs: Some(300),
            // 测试用最低成本参数
            password_hash_memory_kib: 1024,
            password_hash_iterations: 1,
            password_hash_parallelism: 1,
            password_min_length: 1,
        },
        admin: None,
    }
}

/// 创建测试应用（内存存储）
pub fn create_test_app(strategy: TokenStrategy) -> (Router, Arc<AppState>) {
    create_test_app_with_stores(strategy, Stores::memory())
}

/// 使用指定存储创建测试应用
pub fn create_test_app_with_stores(strategy: TokenStrategy, stores: Stores) -> (Router, Arc<AppState>) {
    let config = create_test_config(strategy);
    let state = Arc::new(AppState::new(config, stores, None).expect("Failed to build app state"));
    (routes::create_router(state.clone()), state)
}

/// 发送请求，返回状态码和 JSON 响应体（无响应体时为 Null）
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, body)
}

pub fn basic_auth(email: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", email, password)))
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header("auth-token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("auth-token", token)
        .body(Body::empty())
        .unwrap()
}

/// 注册用户
pub async fn sign_up(app: &Router, username: &str, email: &str, password: &str) -> (StatusCode, Value) {
    let body = json!({ "username": username, "email": email, "password": password });
    send(app, json_request("POST", "/users/signUp", None, body)).await
}

/// 登录并返回令牌
pub async fn sign_in(app: &Router, email: &str, password: &str) -> String {
    let request = Request::builder()
        .method("GET")
        .uri("/auth/signIn")
        .header(header::AUTHORIZATION, basic_auth(email, password))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK, "sign-in failed: {}", body);
    body["token"].as_str().expect("token missing").to_string()
}

/// 注册并登录普通用户
pub async fn member_token(app: &Router, email: &str) -> String {
    let (status, _) = sign_up(app, "member", email, "member-pw").await;
    assert_eq!(status, StatusCode::OK);
    sign_in(app, email, "member-pw").await
}

/// 创建管理员并登录
pub async fn admin_token(app: &Router, state: &AppState, email: &str) -> String {
    let seed = AdminSeedConfig {
        email: email.to_string(),
        username: "admin".to_string(),
        password: Secret::new("admin-pw".to_string()),
    };
    state
        .auth_service
        .ensure_admin(&seed)
        .await
        .expect("Failed to create admin");

    sign_in(app, email, "admin-pw").await
}

/// 以管理员身份创建视频，返回视频 JSON
pub async fn create_video(app: &Router, admin_token: &str, title: &str) -> Value {
    let body = json!({ "title": title, "category": "drama", "description": "test" });
    let (status, video) = send(app, json_request("POST", "/videos", Some(admin_token), body)).await;
    assert_eq!(status, StatusCode::CREATED, "create video failed: {}", video);
    video
}
