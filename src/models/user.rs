//! User domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// User account
///
/// `password_hash` is an Argon2id PHC string. It is never serialized and is
/// redacted from `Debug` output.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

/// Lowercase and trim an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sign-up request
///
/// Fields are optional so that missing ones can be reported individually.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(max = 255, message = "Username must be at most 255 characters"))]
    pub username: Option<String>,
    #[validate(
        email(message = "Invalid email"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Update user request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Username must be 1-255 characters"))]
    pub username: Option<String>,
    #[validate(
        email(message = "Invalid email"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

/// Insert payload for the user store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Partial update for the user store, `None` leaves a column unchanged
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.is_admin.is_none()
    }
}

/// User response (without sensitive data)
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// `GET /users/me` response
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
}

/// Users registered per calendar month, keyed by year and month
#[derive(Debug, Clone, Serialize, PartialEq, Eq, sqlx::FromRow)]
pub struct MonthlyStat {
    pub year: i32,
    pub month: i32,
    pub total: i64,
}

/// `GET /users/all` query
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// Only the five most recently registered users
    #[serde(default)]
    pub new: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_debug_redacts_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "a".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            is_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let printed = format!("{:?}", user);
        assert!(!printed.contains("argon2id"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_user_response_has_no_password() {
        let user = User {
            id: Uuid::new_v4(),
            username: "a".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            is_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_sign_up_request_rejects_bad_email() {
        let req = SignUpRequest {
            username: Some("a".to_string()),
            email: Some("not-an-email".to_string()),
            password: Some("p".to_string()),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_sign_up_request_bounds_username() {
        let req = SignUpRequest {
            username: Some("u".repeat(256)),
            email: Some("a@x.com".to_string()),
            password: Some("p".to_string()),
        };
        assert!(req.validate().is_err());
    }
}
