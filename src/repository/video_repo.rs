//! Video repository (数据库访问层)

use super::VideoStore;
use crate::{
    error::AppError,
    models::video::{CategoryStat, CreateVideoRequest, UpdateVideoRequest, Video},
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct VideoRepository {
    db: PgPool,
}

impl VideoRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoStore for VideoRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(video)
    }

    /// 创建视频（标题唯一约束冲突转换为 Conflict）
    async fn create(&self, owner_id: Uuid, req: &CreateVideoRequest) -> Result<Video, AppError> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos (
                id, title, description, media_ref, trailer_ref, thumbnail_ref,
                category, is_series, owner_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.title.trim())
        .bind(&req.description)
        .bind(&req.media_ref)
        .bind(&req.trailer_ref)
        .bind(&req.thumbnail_ref)
        .bind(&req.category)
        .bind(req.is_series)
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        Ok(video)
    }

    async fn update(&self, id: Uuid, req: &UpdateVideoRequest) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                media_ref = COALESCE($4, media_ref),
                trailer_ref = COALESCE($5, trailer_ref),
                thumbnail_ref = COALESCE($6, thumbnail_ref),
                category = COALESCE($7, category),
                is_series = COALESCE($8, is_series),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.title.as_deref().map(str::trim))
        .bind(&req.description)
        .bind(&req.media_ref)
        .bind(&req.trailer_ref)
        .bind(&req.thumbnail_ref)
        .bind(&req.category)
        .bind(req.is_series)
        .fetch_optional(&self.db)
        .await?;

        Ok(video)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Video>, AppError> {
        let videos = sqlx::query_as::<_, Video>(
            "SELECT * FROM videos ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(videos)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Video>, AppError> {
        let videos = sqlx::query_as::<_, Video>(
            "SELECT * FROM videos WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(videos)
    }

    async fn random(&self, is_series: bool) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<_, Video>(
            "SELECT * FROM videos WHERE is_series = $1 ORDER BY random() LIMIT 1",
        )
        .bind(is_series)
        .fetch_optional(&self.db)
        .await?;

        Ok(video)
    }

    async fn category_stats(&self) -> Result<Vec<CategoryStat>, AppError> {
        let stats = sqlx::query_as::<_, CategoryStat>(
            r#"
            SELECT category, COUNT(*) AS total
            FROM videos
            GROUP BY category
            ORDER BY total DESC, category
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(stats)
    }
}
