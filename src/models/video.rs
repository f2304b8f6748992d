//! Video catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub media_ref: Option<String>,
    pub trailer_ref: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub category: Option<String>,
    pub is_series: bool,
    /// Identity that created the entry
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create video request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateVideoRequest {
    /// Absent in the body reads as empty and is reported as missing
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub media_ref: Option<String>,
    pub trailer_ref: Option<String>,
    pub thumbnail_ref: Option<String>,
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,
    #[serde(default)]
    pub is_series: bool,
}

/// Update video request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateVideoRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub media_ref: Option<String>,
    pub trailer_ref: Option<String>,
    pub thumbnail_ref: Option<String>,
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,
    pub is_series: Option<bool>,
}

impl UpdateVideoRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.media_ref.is_none()
            && self.trailer_ref.is_none()
            && self.thumbnail_ref.is_none()
            && self.category.is_none()
            && self.is_series.is_none()
    }
}

/// Videos per category
#[derive(Debug, Clone, Serialize, PartialEq, Eq, sqlx::FromRow)]
pub struct CategoryStat {
    pub category: Option<String>,
    pub total: i64,
}

/// `GET /videos/random` query
#[derive(Debug, Default, Deserialize)]
pub struct RandomVideoQuery {
    /// `series` selects series, anything else selects movies
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl RandomVideoQuery {
    pub fn wants_series(&self) -> bool {
        self.kind.as_deref() == Some("series")
    }
}

/// `GET /videos/all` query
#[derive(Debug, Default, Deserialize)]
pub struct ListVideosQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
