//! 应用状态与 HTTP 中间件
//! 请求追踪、指标与 JSON 请求体提取

use crate::{
    auth::TokenService,
    config::AppConfig,
    error::AppError,
    repository::Stores,
    services::{AuthService, UserService, VideoService},
};
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
    Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 服务以 Arc 共享，Clone 只是指针拷贝。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// memory 后端时为空
    pub db: Option<sqlx::PgPool>,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub video_service: Arc<VideoService>,
}

impl AppState {
    /// 按配置组装所有服务
    pub fn new(config: AppConfig, stores: Stores, db: Option<sqlx::PgPool>) -> Result<Self, AppError> {
        let tokens = Arc::new(TokenService::from_config(
            &config.security,
            stores.sessions.clone(),
        )?);

        let auth_service = Arc::new(AuthService::new(
            stores.users.clone(),
            tokens.clone(),
            config.security.clone(),
        )?);
        let user_service = Arc::new(UserService::new(
            stores.users.clone(),
            config.security.clone(),
        )?);
        let video_service = Arc::new(VideoService::new(stores.videos.clone()));

        Ok(Self {
            config,
            db,
            auth_service,
            user_service,
            video_service,
        })
    }
}

/// JSON 请求体提取器
///
/// 解析失败统一转为 `AppError::Validation`，空请求体按 `{}` 处理。
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json_content_type = is_json_content_type(req.headers());

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        if bytes.is_empty() {
            let Json(value) = Json::<T>::from_bytes(b"{}")?;
            return Ok(AppJson(value));
        }

        if !json_content_type {
            return Err(AppError::validation(
                "Expected request with `Content-Type: application/json`",
            ));
        }

        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(AppJson(value))
    }
}

/// application/json 或 application/*+json
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    // 生成或提取 trace_id/request_id
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    // 创建 span
    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        // 继续处理请求
        let mut response = next.run(req).await;

        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            303 => "303",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            405 => "405",
            409 => "409",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        // 记录日志（不记录 query，避免泄露参数）
        tracing::info!(
            method = %method,
            path = %path,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        // 在响应头中回传 trace_id
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
