//! Storage contracts and their Postgres / in-memory implementations
//!
//! Handlers and services only see the traits below. Uniqueness of user
//! emails and video titles is enforced by the store itself and surfaces as
//! `AppError::Conflict`.

pub mod memory;
pub mod session_repo;
pub mod user_repo;
pub mod video_repo;

pub use memory::{MemorySessionStore, MemoryUserStore, MemoryVideoStore};
pub use session_repo::SessionRepository;
pub use user_repo::UserRepository;
pub use video_repo::VideoRepository;

use crate::{
    error::AppError,
    models::{
        user::{MonthlyStat, NewUser, User, UserChanges},
        video::{CategoryStat, CreateVideoRequest, UpdateVideoRequest, Video},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

/// User records
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// `email` must already be normalized
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Fails with `Conflict` when the email is taken
    async fn create(&self, user: &NewUser) -> Result<User, AppError>;

    /// `None` when the id is unknown
    async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<Option<User>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Newest first
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError>;

    /// Registrations of the last year grouped by calendar month
    async fn monthly_stats(&self) -> Result<Vec<MonthlyStat>, AppError>;
}

/// Video records
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Video>, AppError>;

    /// Fails with `Conflict` when the title is taken
    async fn create(&self, owner_id: Uuid, req: &CreateVideoRequest) -> Result<Video, AppError>;

    async fn update(&self, id: Uuid, req: &UpdateVideoRequest) -> Result<Option<Video>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Newest first
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Video>, AppError>;

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Video>, AppError>;

    async fn random(&self, is_series: bool) -> Result<Option<Video>, AppError>;

    async fn category_stats(&self) -> Result<Vec<CategoryStat>, AppError>;
}

/// Session mapping stored for an opaque token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Key-value session store with per-entry TTL
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace the mapping for `key`
    async fn set_with_ttl(&self, key: &str, user_id: Uuid, ttl: Duration) -> Result<(), AppError>;

    /// May return an expired record; callers check `expires_at`
    async fn get(&self, key: &str) -> Result<Option<SessionRecord>, AppError>;

    /// Deleting an absent key is not an error; returns whether a key was removed
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    async fn purge_expired(&self) -> Result<u64, AppError>;
}

/// The store set an application instance runs on
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub videos: Arc<dyn VideoStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            videos: Arc::new(VideoRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool)),
        }
    }

    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::new()),
            videos: Arc::new(MemoryVideoStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }
}

/// Clamp client supplied pagination to sane bounds
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(50).clamp(1, 100);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

pub(crate) fn ttl_to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(3650))
}
