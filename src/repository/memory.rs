//! In-memory stores
//!
//! Same contracts as the Postgres repositories, including uniqueness and TTL
//! semantics. Used by `database.backend = "memory"` and by the test suite.

use super::{ttl_to_chrono, SessionRecord, SessionStore, UserStore, VideoStore};
use crate::{
    error::AppError,
    models::{
        user::{MonthlyStat, NewUser, User, UserChanges},
        video::{CategoryStat, CreateVideoRequest, UpdateVideoRequest, Video},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use rand::seq::IteratorRandom;
use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};
use tokio::sync::RwLock;
use uuid::Uuid;

// ==================== Users ====================

#[derive(Default)]
struct UserTable {
    by_id: HashMap<Uuid, User>,
    /// normalized email -> id
    by_email: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    table: RwLock<UserTable>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn paginate<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.table.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let table = self.table.read().await;
        Ok(table
            .by_email
            .get(email)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.table.read().await.by_email.contains_key(email))
    }

    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let mut table = self.table.write().await;
        if table.by_email.contains_key(&user.email) {
            return Err(AppError::conflict("Email already in use"));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            is_admin: user.is_admin,
            created_at: now,
            updated_at: now,
        };

        table.by_email.insert(record.email.clone(), record.id);
        table.by_id.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<Option<User>, AppError> {
        let mut table = self.table.write().await;
        let Some(current_email) = table.by_id.get(&id).map(|u| u.email.clone()) else {
            return Ok(None);
        };

        if let Some(email) = &changes.email {
            if *email != current_email {
                if table.by_email.contains_key(email) {
                    return Err(AppError::conflict("Email already in use"));
                }
                table.by_email.remove(&current_email);
                table.by_email.insert(email.clone(), id);
            }
        }

        let Some(user) = table.by_id.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = &changes.username {
            user.username = username.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(password_hash) = &changes.password_hash {
            user.password_hash = password_hash.clone();
        }
        if let Some(is_admin) = changes.is_admin {
            user.is_admin = is_admin;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut table = self.table.write().await;
        match table.by_id.remove(&id) {
            Some(user) => {
                table.by_email.remove(&user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.table.read().await.by_id.values().cloned().collect();
        newest_first(&mut users, |u| u.created_at);
        Ok(paginate(users, limit, offset))
    }

    async fn monthly_stats(&self) -> Result<Vec<MonthlyStat>, AppError> {
        let since = Utc::now() - chrono::Duration::days(365);
        let table = self.table.read().await;

        Ok(group_by_month(
            table
                .by_id
                .values()
                .map(|u| u.created_at)
                .filter(|created_at| *created_at > since),
        ))
    }
}

/// 按 (年, 月) 计数，结果按时间升序
fn group_by_month(dates: impl Iterator<Item = DateTime<Utc>>) -> Vec<MonthlyStat> {
    let mut months: BTreeMap<(i32, u32), i64> = BTreeMap::new();
    for date in dates {
        *months.entry((date.year(), date.month())).or_default() += 1;
    }

    months
        .into_iter()
        .map(|((year, month), total)| MonthlyStat {
            year,
            month: month as i32,
            total,
        })
        .collect()
}

// ==================== Videos ====================

#[derive(Default)]
pub struct MemoryVideoStore {
    videos: RwLock<HashMap<Uuid, Video>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn title_taken(videos: &HashMap<Uuid, Video>, title: &str, except: Option<Uuid>) -> bool {
    videos
        .values()
        .any(|v| v.title == title && Some(v.id) != except)
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        Ok(self.videos.read().await.get(&id).cloned())
    }

    async fn create(&self, owner_id: Uuid, req: &CreateVideoRequest) -> Result<Video, AppError> {
        let mut videos = self.videos.write().await;
        let title = req.title.trim().to_string();
        if title_taken(&videos, &title, None) {
            return Err(AppError::conflict("Title already in use"));
        }

        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            title,
            description: req.description.clone(),
            media_ref: req.media_ref.clone(),
            trailer_ref: req.trailer_ref.clone(),
            thumbnail_ref: req.thumbnail_ref.clone(),
            category: req.category.clone(),
            is_series: req.is_series,
            owner_id,
            created_at: now,
            updated_at: now,
        };

        videos.insert(video.id, video.clone());
        Ok(video)
    }

    async fn update(&self, id: Uuid, req: &UpdateVideoRequest) -> Result<Option<Video>, AppError> {
        let mut videos = self.videos.write().await;
        let title = req.title.as_deref().map(|t| t.trim().to_string());
        if let Some(title) = &title {
            if title_taken(&videos, title, Some(id)) {
                return Err(AppError::conflict("Title already in use"));
            }
        }

        let Some(video) = videos.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = title {
            video.title = title;
        }
        if let Some(description) = &req.description {
            video.description = Some(description.clone());
        }
        if let Some(media_ref) = &req.media_ref {
            video.media_ref = Some(media_ref.clone());
        }
        if let Some(trailer_ref) = &req.trailer_ref {
            video.trailer_ref = Some(trailer_ref.clone());
        }
        if let Some(thumbnail_ref) = &req.thumbnail_ref {
            video.thumbnail_ref = Some(thumbnail_ref.clone());
        }
        if let Some(category) = &req.category {
            video.category = Some(category.clone());
        }
        if let Some(is_series) = req.is_series {
            video.is_series = is_series;
        }
        video.updated_at = Utc::now();

        Ok(Some(video.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.videos.write().await.remove(&id).is_some())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Video>, AppError> {
        let mut videos: Vec<Video> = self.videos.read().await.values().cloned().collect();
        newest_first(&mut videos, |v| v.created_at);
        Ok(paginate(videos, limit, offset))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Video>, AppError> {
        let mut videos: Vec<Video> = self
            .videos
            .read()
            .await
            .values()
            .filter(|v| v.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut videos, |v| v.created_at);
        Ok(videos)
    }

    async fn random(&self, is_series: bool) -> Result<Option<Video>, AppError> {
        let videos = self.videos.read().await;
        Ok(videos
            .values()
            .filter(|v| v.is_series == is_series)
            .choose(&mut rand::thread_rng())
            .cloned())
    }

    async fn category_stats(&self) -> Result<Vec<CategoryStat>, AppError> {
        let mut counts: HashMap<Option<String>, i64> = HashMap::new();
        for video in self.videos.read().await.values() {
            *counts.entry(video.category.clone()).or_default() += 1;
        }

        let mut stats: Vec<CategoryStat> = counts
            .into_iter()
            .map(|(category, total)| CategoryStat { category, total })
            .collect();
        stats.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        Ok(stats)
    }
}

// ==================== Sessions ====================

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set_with_ttl(&self, key: &str, user_id: Uuid, ttl: Duration) -> Result<(), AppError> {
        let record = SessionRecord {
            user_id,
            expires_at: Utc::now() + ttl_to_chrono(ttl),
        };
        self.sessions.insert(key.to_string(), record);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<SessionRecord>, AppError> {
        Ok(self.sessions.get(key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.sessions.remove(key).is_some())
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, record| !record.is_expired(now));
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}
