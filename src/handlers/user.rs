//! 用户相关的 HTTP 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    middleware::{AppJson, AppState},
    models::user::{ListUsersQuery, SignUpRequest, UpdateUserRequest, UserResponse},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// 注册
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.sign_up(req).await?;

    Ok(Json(UserResponse::from(user)))
}

/// 当前用户
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let me = state.user_service.me(&auth_context).await?;

    Ok(Json(me))
}

/// 列出用户（?new=true 只返回最近注册的用户）
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let users = state.user_service.list(&auth_context, &query).await?;

    Ok(Json(users))
}

/// 按月注册统计
pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.user_service.stats(&auth_context).await?;

    Ok(Json(stats))
}

/// 更新用户
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.update(&auth_context, id, req).await?;

    Ok(Json(user))
}

/// 删除用户
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.user_service.delete(&auth_context, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
