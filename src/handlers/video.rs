//! 视频目录的 HTTP 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    middleware::{AppJson, AppState},
    models::video::{CreateVideoRequest, ListVideosQuery, RandomVideoQuery, UpdateVideoRequest},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// 创建视频
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    AppJson(req): AppJson<CreateVideoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let video = state.video_service.create(&auth_context, req).await?;

    Ok((StatusCode::CREATED, Json(video)))
}

/// 获取视频
pub async fn find_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let video = state.video_service.get(id).await?;

    Ok(Json(video))
}

/// 随机视频（?type=series 取剧集，否则取电影）
pub async fn random_video(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RandomVideoQuery>,
) -> Result<impl IntoResponse, AppError> {
    let video = state.video_service.random(&query).await?;

    Ok(Json(video))
}

/// 当前用户创建的视频
pub async fn my_videos(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let videos = state.video_service.list_mine(&auth_context).await?;

    Ok(Json(videos))
}

/// 全部视频
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(query): Query<ListVideosQuery>,
) -> Result<impl IntoResponse, AppError> {
    let videos = state.video_service.list_all(&auth_context, &query).await?;

    Ok(Json(videos))
}

/// 按分类统计
pub async fn video_stats(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.video_service.stats(&auth_context).await?;

    Ok(Json(stats))
}

/// 更新视频
pub async fn update_video(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateVideoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let video = state.video_service.update(&auth_context, id, req).await?;

    Ok(Json(video))
}

/// 删除视频
pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.video_service.delete(&auth_context, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
