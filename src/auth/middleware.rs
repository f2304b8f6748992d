//! 认证闸门中间件

use crate::{error::AppError, services::AuthService};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use uuid::Uuid;

/// 携带令牌的请求头
pub const AUTH_TOKEN_HEADER: &str = "auth-token";

/// 已登录用户跳转的位置
pub const SIGNED_IN_REDIRECT: &str = "/users/me";

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub is_admin: bool,
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}

/// 从 auth-token 头提取令牌（空值视为缺失）
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 必须登录
///
/// 任何令牌校验失败都统一返回 401；存储故障按 5xx 透传。
pub async fn login_required(
    State(auth_service): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers()).ok_or(AppError::Unauthorized)?;

    let auth_context = auth_service.authenticate(token).await?;

    // 附加到请求扩展
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// 必须未登录（登录、注册路由使用）
pub async fn logout_required(
    State(auth_service): State<Arc<AuthService>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = extract_token(req.headers()) {
        match auth_service.authenticate(token).await {
            Ok(_) => return Ok(Redirect::to(SIGNED_IN_REDIRECT).into_response()),
            // 无效令牌等同未登录
            Err(AppError::Unauthorized) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(next.run(req).await)
}
