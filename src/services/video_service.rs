//! 视频目录服务

use super::permission_service::{require, Action};
use crate::{
    auth::AuthContext,
    error::AppError,
    models::video::{
        CategoryStat, CreateVideoRequest, ListVideosQuery, RandomVideoQuery, UpdateVideoRequest,
        Video,
    },
    repository::{page_bounds, VideoStore},
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct VideoService {
    videos: Arc<dyn VideoStore>,
}

impl VideoService {
    pub fn new(videos: Arc<dyn VideoStore>) -> Self {
        Self { videos }
    }

    async fn find(&self, id: Uuid) -> Result<Video, AppError> {
        self.videos
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Video"))
    }

    /// 创建视频（仅管理员），创建者记为所有者
    pub async fn create(&self, ctx: &AuthContext, req: CreateVideoRequest) -> Result<Video, AppError> {
        require(ctx, Action::CreateVideo, None)?;

        if req.title.trim().is_empty() {
            return Err(AppError::validation("Missing title"));
        }
        req.validate()?;

        let video = self.videos.create(ctx.user_id, &req).await?;

        tracing::info!(video_id = %video.id, owner_id = %video.owner_id, "Video created");

        Ok(video)
    }

    pub async fn get(&self, id: Uuid) -> Result<Video, AppError> {
        self.find(id).await
    }

    /// 随机取一部电影或剧集
    pub async fn random(&self, query: &RandomVideoQuery) -> Result<Video, AppError> {
        self.videos
            .random(query.wants_series())
            .await?
            .ok_or_else(|| AppError::not_found("Video"))
    }

    pub async fn list_mine(&self, ctx: &AuthContext) -> Result<Vec<Video>, AppError> {
        self.videos.list_by_owner(ctx.user_id).await
    }

    /// 全部视频（仅管理员）
    pub async fn list_all(
        &self,
        ctx: &AuthContext,
        query: &ListVideosQuery,
    ) -> Result<Vec<Video>, AppError> {
        require(ctx, Action::ListVideos, None)?;

        let (limit, offset) = page_bounds(query.limit, query.offset);
        self.videos.list(limit, offset).await
    }

    /// 按分类统计（仅管理员）
    pub async fn stats(&self, ctx: &AuthContext) -> Result<Vec<CategoryStat>, AppError> {
        require(ctx, Action::VideoStats, None)?;
        self.videos.category_stats().await
    }

    /// 更新视频（所有者或管理员）
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        req: UpdateVideoRequest,
    ) -> Result<Video, AppError> {
        let video = self.find(id).await?;
        require(ctx, Action::UpdateVideo, Some(video.owner_id))?;

        if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(AppError::validation("Title must not be empty"));
        }
        req.validate()?;

        if req.is_empty() {
            return Ok(video);
        }

        let video = self
            .videos
            .update(id, &req)
            .await?
            .ok_or_else(|| AppError::not_found("Video"))?;

        tracing::info!(video_id = %video.id, actor_id = %ctx.user_id, "Video updated");

        Ok(video)
    }

    /// 删除视频（所有者或管理员）
    pub async fn delete(&self, ctx: &AuthContext, id: Uuid) -> Result<(), AppError> {
        let video = self.find(id).await?;
        require(ctx, Action::DeleteVideo, Some(video.owner_id))?;

        if !self.videos.delete(id).await? {
            return Err(AppError::not_found("Video"));
        }

        tracing::info!(video_id = %id, actor_id = %ctx.user_id, "Video deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryVideoStore;

    fn service() -> VideoService {
        VideoService::new(Arc::new(MemoryVideoStore::new()))
    }

    fn admin() -> AuthContext {
        AuthContext { user_id: Uuid::new_v4(), is_admin: true }
    }

    fn member() -> AuthContext {
        AuthContext { user_id: Uuid::new_v4(), is_admin: false }
    }

    fn video(title: &str) -> CreateVideoRequest {
        CreateVideoRequest {
            title: title.to_string(),
            category: Some("drama".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let service = service();
        assert!(matches!(
            service.create(&member(), video("Arrival")).await,
            Err(AppError::Forbidden)
        ));

        let admin = admin();
        let created = service.create(&admin, video("Arrival")).await.unwrap();
        assert_eq!(created.owner_id, admin.user_id);
        assert_eq!(service.list_mine(&admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_and_duplicate_title() {
        let service = service();
        let admin = admin();

        assert!(matches!(
            service.create(&admin, video("   ")).await,
            Err(AppError::Validation(_))
        ));

        service.create(&admin, video("Arrival")).await.unwrap();
        let err = service.create(&admin, video("Arrival")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.user_message(), "Title already in use");
    }

    #[tokio::test]
    async fn test_delete_owner_or_admin() {
        let service = service();
        let owner = admin();
        let created = service.create(&owner, video("Arrival")).await.unwrap();

        assert!(matches!(
            service.delete(&member(), created.id).await,
            Err(AppError::Forbidden)
        ));

        service.delete(&admin(), created.id).await.unwrap();
        assert!(matches!(service.get(created.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_partial() {
        let service = service();
        let owner = admin();
        let created = service.create(&owner, video("Arrival")).await.unwrap();

        let req = UpdateVideoRequest { description: Some("aliens".to_string()), ..Default::default() };
        let updated = service.update(&owner, created.id, req).await.unwrap();

        assert_eq!(updated.title, "Arrival");
        assert_eq!(updated.description.as_deref(), Some("aliens"));
    }

    #[tokio::test]
    async fn test_random_and_stats() {
        let service = service();
        let admin = admin();
        service.create(&admin, video("Arrival")).await.unwrap();

        assert!(service.random(&RandomVideoQuery::default()).await.is_ok());
        let series = RandomVideoQuery { kind: Some("series".to_string()) };
        assert!(matches!(service.random(&series).await, Err(AppError::NotFound(_))));

        let stats = service.stats(&admin).await.unwrap();
        assert_eq!(stats, vec![CategoryStat { category: Some("drama".to_string()), total: 1 }]);
        assert!(matches!(service.stats(&member()).await, Err(AppError::Forbidden)));
    }
}
