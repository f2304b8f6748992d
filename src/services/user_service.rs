//! 用户服务

use super::permission_service::{require, Action};
use crate::{
    auth::{AuthContext, PasswordHasher},
    config::SecurityConfig,
    error::AppError,
    models::user::{
        normalize_email, ListUsersQuery, MeResponse, MonthlyStat, UpdateUserRequest, UserChanges,
        UserResponse,
    },
    repository::{page_bounds, UserStore},
};
use std::sync::Arc;
use validator::Validate;

/// `?new=true` 返回的最近注册用户数
const NEW_USERS_LIMIT: i64 = 5;

pub struct UserService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    security: SecurityConfig,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, security: SecurityConfig) -> Result<Self, AppError> {
        Ok(Self {
            users,
            hasher: PasswordHasher::from_config(&security)?,
            security,
        })
    }

    /// 当前用户
    pub async fn me(&self, ctx: &AuthContext) -> Result<MeResponse, AppError> {
        let user = self
            .users
            .find_by_id(ctx.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        Ok(MeResponse {
            id: user.id,
            email: user.email,
        })
    }

    /// 用户列表（仅管理员）
    pub async fn list(
        &self,
        ctx: &AuthContext,
        query: &ListUsersQuery,
    ) -> Result<Vec<UserResponse>, AppError> {
        require(ctx, Action::ListUsers, None)?;

        let (limit, offset) = if query.new {
            (NEW_USERS_LIMIT, 0)
        } else {
            page_bounds(query.limit, query.offset)
        };

        let users = self.users.list(limit, offset).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// 近一年按月注册统计（仅管理员）
    pub async fn stats(&self, ctx: &AuthContext) -> Result<Vec<MonthlyStat>, AppError> {
        require(ctx, Action::UserStats, None)?;
        self.users.monthly_stats().await
    }

    /// 更新用户（本人或管理员）
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: uuid::Uuid,
        req: UpdateUserRequest,
    ) -> Result<UserResponse, AppError> {
        require(ctx, Action::UpdateUser, Some(id))?;
        if req.is_admin.is_some() {
            require(ctx, Action::GrantAdmin, None)?;
        }

        // 先规范化再校验，与注册一致
        let req = UpdateUserRequest {
            username: req.username.map(|u| u.trim().to_string()),
            email: req.email.as_deref().map(normalize_email),
            ..req
        };
        req.validate()?;

        let mut changes = UserChanges {
            username: req.username,
            is_admin: req.is_admin,
            ..Default::default()
        };

        let current = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        if let Some(email) = req.email {
            if email != current.email && self.users.email_exists(&email).await? {
                return Err(AppError::BadRequest("Email already in use".to_string()));
            }
            changes.email = Some(email);
        }

        // 密码变更时重新哈希
        if let Some(password) = req.password {
            PasswordHasher::validate_password_policy(&password, &self.security)?;
            changes.password_hash = Some(self.hasher.hash(&password)?);
        }

        if changes.is_empty() {
            return Ok(UserResponse::from(current));
        }

        let user = self
            .users
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        tracing::info!(
            user_id = %user.id,
            actor_id = %ctx.user_id,
            password_changed = changes.password_hash.is_some(),
            "User updated"
        );

        Ok(UserResponse::from(user))
    }

    /// 删除用户（本人或管理员）
    pub async fn delete(&self, ctx: &AuthContext, id: uuid::Uuid) -> Result<(), AppError> {
        require(ctx, Action::DeleteUser, Some(id))?;

        if !self.users.delete(id).await? {
            return Err(AppError::not_found("User"));
        }

        tracing::info!(user_id = %id, actor_id = %ctx.user_id, "User deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::TokenStrategy,
        models::user::{NewUser, User},
        repository::MemoryUserStore,
    };
    use secrecy::Secret;
    use uuid::Uuid;

    fn security() -> SecurityConfig {
        SecurityConfig {
            secret_key: Secret::new("test_secret_key_32_characters_long!".to_string()),
            token_strategy: TokenStrategy::Signed,
            token_ttl_secs: None,
            password_hash_memory_kib: 1024,
            password_hash_iterations: 1,
            password_hash_parallelism: 1,
            password_min_length: 1,
        }
    }

    async fn setup() -> (UserService, Arc<MemoryUserStore>, User) {
        let store = Arc::new(MemoryUserStore::new());
        let service = UserService::new(store.clone(), security()).unwrap();
        let user = store
            .create(&NewUser {
                username: "a".to_string(),
                email: "a@x.com".to_string(),
                password_hash: service.hasher.hash("p").unwrap(),
                is_admin: false,
            })
            .await
            .unwrap();
        (service, store, user)
    }

    fn ctx(user: &User) -> AuthContext {
        AuthContext { user_id: user.id, is_admin: user.is_admin }
    }

    fn admin() -> AuthContext {
        AuthContext { user_id: Uuid::new_v4(), is_admin: true }
    }

    #[tokio::test]
    async fn test_me() {
        let (service, _, user) = setup().await;
        let me = service.me(&ctx(&user)).await.unwrap();
        assert_eq!(me.id, user.id);
        assert_eq!(me.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_owner_updates_password_rehashed() {
        let (service, store, user) = setup().await;
        let req = UpdateUserRequest { password: Some("new".to_string()), ..Default::default() };

        service.update(&ctx(&user), user.id, req).await.unwrap();

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "new");
        assert!(service.hasher.verify("new", &stored.password_hash).unwrap());
        assert!(!service.hasher.verify("p", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update() {
        let (service, _, user) = setup().await;
        let stranger = AuthContext { user_id: Uuid::new_v4(), is_admin: false };
        let req = UpdateUserRequest { username: Some("x".to_string()), ..Default::default() };

        assert!(matches!(
            service.update(&stranger, user.id, req).await,
            Err(AppError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_only_admin_grants_admin() {
        let (service, _, user) = setup().await;

        let req = UpdateUserRequest { is_admin: Some(true), ..Default::default() };
        assert!(matches!(
            service.update(&ctx(&user), user.id, req).await,
            Err(AppError::Forbidden)
        ));

        let req = UpdateUserRequest { is_admin: Some(true), ..Default::default() };
        let updated = service.update(&admin(), user.id, req).await.unwrap();
        assert!(updated.is_admin);
    }

    #[tokio::test]
    async fn test_update_email_normalized_and_unique() {
        let (service, store, user) = setup().await;
        store
            .create(&NewUser {
                username: "b".to_string(),
                email: "b@x.com".to_string(),
                password_hash: "h".to_string(),
                is_admin: false,
            })
            .await
            .unwrap();

        let req = UpdateUserRequest { email: Some("B@x.com".to_string()), ..Default::default() };
        let err = service.update(&ctx(&user), user.id, req).await.unwrap_err();
        assert_eq!(err.user_message(), "Email already in use");

        let req = UpdateUserRequest { email: Some("C@X.com".to_string()), ..Default::default() };
        let updated = service.update(&ctx(&user), user.id, req).await.unwrap();
        assert_eq!(updated.email, "c@x.com");
    }

    #[tokio::test]
    async fn test_update_accepts_padded_email() {
        let (service, _, user) = setup().await;

        let req = UpdateUserRequest { email: Some(" D@X.com ".to_string()), ..Default::default() };
        let updated = service.update(&ctx(&user), user.id, req).await.unwrap();
        assert_eq!(updated.email, "d@x.com");
    }

    #[tokio::test]
    async fn test_update_rejects_blank_or_long_username() {
        let (service, _, user) = setup().await;

        for username in ["   ".to_string(), "u".repeat(256)] {
            let req = UpdateUserRequest { username: Some(username), ..Default::default() };
            assert!(matches!(
                service.update(&ctx(&user), user.id, req).await,
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let (service, _, user) = setup().await;

        service.delete(&ctx(&user), user.id).await.unwrap();
        assert!(matches!(
            service.delete(&admin(), user.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_stats_admin_only() {
        let (service, _, user) = setup().await;

        assert!(matches!(
            service.list(&ctx(&user), &ListUsersQuery::default()).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(service.stats(&ctx(&user)).await, Err(AppError::Forbidden)));

        let query = ListUsersQuery { new: true, ..Default::default() };
        assert_eq!(service.list(&admin(), &query).await.unwrap().len(), 1);
        assert_eq!(service.stats(&admin()).await.unwrap()[0].total, 1);
    }
}
