//! Session repository (会话令牌存储)
//!
//! Keys are SHA-256 digests of opaque tokens; raw tokens never reach the table.

use super::{ttl_to_chrono, SessionRecord, SessionStore};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

pub struct SessionRepository {
    db: PgPool,
}

impl SessionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    /// 存储会话（同一 key 覆盖写入）
    async fn set_with_ttl(&self, key: &str, user_id: Uuid, ttl: Duration) -> Result<(), AppError> {
        let expires_at = Utc::now() + ttl_to_chrono(ttl);

        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token_hash)
            DO UPDATE SET user_id = EXCLUDED.user_id, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<SessionRecord>, AppError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token_hash = $1")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|row| SessionRecord {
            user_id: row.get::<Uuid, _>("user_id"),
            expires_at: row.get::<DateTime<Utc>, _>("expires_at"),
        }))
    }

    /// 删除会话（不存在时不报错）
    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(key)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 清理过期的会话
    async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
