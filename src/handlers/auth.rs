//! 认证相关的 HTTP 处理器

use crate::{
    auth::{extract_token, AuthContext, BasicCredentials},
    error::AppError,
    middleware::AppState,
    models::auth::SignInResponse,
};
use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

/// 登录（Authorization: Basic）
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let credentials = BasicCredentials::from_headers(&headers)?;

    let token = state.auth_service.sign_in(credentials).await?;

    Ok(Json(SignInResponse { token }))
}

/// 登出
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    // 经过 login_required，令牌一定存在
    let token = extract_token(&headers).ok_or(AppError::Unauthorized)?;

    state.auth_service.sign_out(token).await?;

    tracing::debug!(user_id = %auth_context.user_id, "Session closed");

    Ok(StatusCode::NO_CONTENT)
}
