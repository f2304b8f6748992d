//! 认证服务：注册、登录、登出、请求认证

use crate::{
    auth::{AuthContext, BasicCredentials, PasswordHasher, TokenService},
    config::{AdminSeedConfig, SecurityConfig},
    error::AppError,
    models::user::{normalize_email, NewUser, SignUpRequest, User, UserChanges},
    repository::UserStore,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use validator::Validate;

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    security: SecurityConfig,
    /// 用户不存在时也做一次校验，避免通过耗时区分邮箱是否存在
    dummy_hash: String,
}

/// 取出必填字段，空白视为缺失
fn required(value: Option<String>, missing: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(missing))
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        security: SecurityConfig,
    ) -> Result<Self, AppError> {
        let hasher = PasswordHasher::from_config(&security)?;
        let dummy_hash = hasher.hash("dummy-password-for-timing")?;

        Ok(Self {
            users,
            tokens,
            hasher,
            security,
            dummy_hash,
        })
    }

    /// 用户注册
    pub async fn sign_up(&self, req: SignUpRequest) -> Result<User, AppError> {
        // 按 username -> email -> password 的顺序报告缺失字段
        let username = required(req.username.clone(), "Missing username")?;
        let email = required(req.email.clone(), "Missing email")?;
        let password = req
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::validation("Missing password"))?;

        let email = normalize_email(&email);
        SignUpRequest {
            username: Some(username.clone()),
            email: Some(email.clone()),
            password: Some(password.clone()),
        }
        .validate()?;

        PasswordHasher::validate_password_policy(&password, &self.security)?;

        if self.users.email_exists(&email).await? {
            return Err(AppError::BadRequest("Email already in use".to_string()));
        }

        let password_hash = self.hasher.hash(&password)?;

        // 并发注册时由存储层的唯一约束兜底（Conflict）
        let user = self
            .users
            .create(&NewUser {
                username,
                email,
                password_hash,
                is_admin: false,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User signed up");

        Ok(user)
    }

    /// 用户登录，成功返回令牌
    ///
    /// 邮箱不存在与密码错误返回同一个 Unauthorized。
    pub async fn sign_in(&self, credentials: BasicCredentials) -> Result<String, AppError> {
        let user = self.users.find_by_email(&credentials.email).await?;

        let user = match user {
            Some(user) if self.hasher.verify(&credentials.password, &user.password_hash)? => user,
            Some(user) => {
                tracing::info!(user_id = %user.id, "Sign-in failed");
                return Err(AppError::Unauthorized);
            }
            None => {
                let _ = self.hasher.verify(&credentials.password, &self.dummy_hash)?;
                tracing::info!("Sign-in failed");
                return Err(AppError::Unauthorized);
            }
        };

        let token = self.tokens.issue(&user).await?;

        tracing::info!(
            user_id = %user.id,
            strategy = ?self.tokens.strategy(),
            "User signed in"
        );

        Ok(token)
    }

    /// 登出：撤销会话令牌（签名令牌无法提前失效）
    pub async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        self.tokens.revoke(token).await?;
        tracing::info!(strategy = ?self.tokens.strategy(), "User signed out");
        Ok(())
    }

    /// 校验令牌并解析出当前身份
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext, AppError> {
        let verified = self.tokens.verify(token).await.map_err(|e| {
            tracing::debug!(reason = %e, "Token rejected");
            AppError::from(e)
        })?;

        let is_admin = match verified.is_admin {
            Some(is_admin) => is_admin,
            None => {
                // 不透明令牌不携带角色，按用户记录解析
                let user = self
                    .users
                    .find_by_id(verified.user_id)
                    .await?
                    .ok_or(AppError::Unauthorized)?;
                user.is_admin
            }
        };

        Ok(AuthContext {
            user_id: verified.user_id,
            is_admin,
        })
    }

    /// 启动时确保管理员账户存在
    pub async fn ensure_admin(&self, seed: &AdminSeedConfig) -> Result<User, AppError> {
        let email = normalize_email(&seed.email);

        if let Some(existing) = self.users.find_by_email(&email).await? {
            if existing.is_admin {
                return Ok(existing);
            }

            let changes = UserChanges {
                is_admin: Some(true),
                ..Default::default()
            };
            let promoted = self
                .users
                .update(existing.id, &changes)
                .await?
                .ok_or_else(|| AppError::not_found("User"))?;

            tracing::info!(user_id = %promoted.id, "Existing account promoted to admin");
            return Ok(promoted);
        }

        let username = if seed.username.trim().is_empty() {
            "admin".to_string()
        } else {
            seed.username.trim().to_string()
        };
        let password_hash = self.hasher.hash(seed.password.expose_secret())?;

        let admin = self
            .users
            .create(&NewUser {
                username,
                email,
                password_hash,
                is_admin: true,
            })
            .await?;

        tracing::info!(user_id = %admin.id, "Admin account created");

        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::TokenStrategy,
        repository::{MemorySessionStore, MemoryUserStore},
    };
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use secrecy::Secret;

    fn security(strategy: TokenStrategy) -> SecurityConfig {
        SecurityConfig {
            secret_key: Secret::new("test_secret_key_32_characters_long!".to_string()),
            token_strategy: strategy,
            token_ttl_secs: None,
            password_hash_memory_kib: 1024,
            password_hash_iterations: 1,
            password_hash_parallelism: 1,
            password_min_length: 1,
        }
    }

    fn service(strategy: TokenStrategy) -> AuthService {
        let config = security(strategy);
        let tokens =
            TokenService::from_config(&config, Arc::new(MemorySessionStore::new())).unwrap();
        AuthService::new(Arc::new(MemoryUserStore::new()), Arc::new(tokens), config).unwrap()
    }

    fn signup(username: &str, email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn credentials(email: &str, password: &str) -> BasicCredentials {
        let mut headers = axum::http::HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(format!("{}:{}", email, password)));
        headers.insert("authorization", value.parse().unwrap());
        BasicCredentials::from_headers(&headers).unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_reports_missing_fields_in_order() {
        let service = service(TokenStrategy::Signed);

        let err = service.sign_up(SignUpRequest::default()).await.unwrap_err();
        assert_eq!(err.user_message(), "Missing username");

        let req = SignUpRequest { username: Some("a".to_string()), ..Default::default() };
        assert_eq!(service.sign_up(req).await.unwrap_err().user_message(), "Missing email");

        let req = SignUpRequest {
            username: Some("a".to_string()),
            email: Some("a@x.com".to_string()),
            password: None,
        };
        assert_eq!(service.sign_up(req).await.unwrap_err().user_message(), "Missing password");
    }

    #[tokio::test]
    async fn test_sign_up_hashes_and_normalizes() {
        let service = service(TokenStrategy::Signed);
        let user = service.sign_up(signup("a", " A@X.com ", "p")).await.unwrap();

        assert_eq!(user.email, "a@x.com");
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "p");
        assert!(service.hasher.verify("p", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email() {
        let service = service(TokenStrategy::Signed);
        service.sign_up(signup("a", "a@x.com", "p")).await.unwrap();

        let err = service.sign_up(signup("b", "A@x.com", "q")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.user_message(), "Email already in use");
    }

    #[tokio::test]
    async fn test_sign_up_invalid_email() {
        let service = service(TokenStrategy::Signed);
        let err = service.sign_up(signup("a", "not-an-email", "p")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.user_message(), "Invalid email");
    }

    #[tokio::test]
    async fn test_sign_up_rejects_overlong_username() {
        let service = service(TokenStrategy::Signed);
        let err = service
            .sign_up(signup(&"u".repeat(256), "a@x.com", "p"))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Username must be at most 255 characters");
        assert!(service.users.find_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_failures_are_uniform() {
        let service = service(TokenStrategy::Signed);
        service.sign_up(signup("a", "a@x.com", "p")).await.unwrap();

        let wrong_password = service.sign_in(credentials("a@x.com", "nope")).await.unwrap_err();
        let unknown_email = service.sign_in(credentials("b@x.com", "p")).await.unwrap_err();

        assert!(matches!(wrong_password, AppError::Unauthorized));
        assert!(matches!(unknown_email, AppError::Unauthorized));
        assert_eq!(wrong_password.user_message(), unknown_email.user_message());
    }

    #[tokio::test]
    async fn test_signed_sign_in_and_authenticate() {
        let service = service(TokenStrategy::Signed);
        let user = service.sign_up(signup("a", "a@x.com", "p")).await.unwrap();

        let token = service.sign_in(credentials("a@x.com", "p")).await.unwrap();
        let ctx = service.authenticate(&token).await.unwrap();

        assert_eq!(ctx, AuthContext { user_id: user.id, is_admin: false });
    }

    #[tokio::test]
    async fn test_opaque_sign_out_revokes() {
        let service = service(TokenStrategy::Opaque);
        service.sign_up(signup("a", "a@x.com", "p")).await.unwrap();

        let token = service.sign_in(credentials("a@x.com", "p")).await.unwrap();
        assert!(service.authenticate(&token).await.is_ok());

        service.sign_out(&token).await.unwrap();
        assert!(matches!(service.authenticate(&token).await, Err(AppError::Unauthorized)));

        // 再次登出不报错
        service.sign_out(&token).await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        for strategy in [TokenStrategy::Signed, TokenStrategy::Opaque] {
            let service = service(strategy);
            assert!(matches!(
                service.authenticate("garbage").await,
                Err(AppError::Unauthorized)
            ));
        }
    }

    #[tokio::test]
    async fn test_ensure_admin_creates_then_is_idempotent() {
        let service = service(TokenStrategy::Opaque);
        let seed = AdminSeedConfig {
            email: "Root@x.com".to_string(),
            username: "root".to_string(),
            password: Secret::new("rootpw".to_string()),
        };

        let admin = service.ensure_admin(&seed).await.unwrap();
        assert!(admin.is_admin);
        assert_eq!(admin.email, "root@x.com");

        let again = service.ensure_admin(&seed).await.unwrap();
        assert_eq!(again.id, admin.id);

        let token = service.sign_in(credentials("root@x.com", "rootpw")).await.unwrap();
        assert!(service.authenticate(&token).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_ensure_admin_promotes_existing_account() {
        let service = service(TokenStrategy::Signed);
        let user = service.sign_up(signup("a", "a@x.com", "p")).await.unwrap();
        let seed = AdminSeedConfig {
            email: "a@x.com".to_string(),
            username: "ignored".to_string(),
            password: Secret::new("other".to_string()),
        };

        let promoted = service.ensure_admin(&seed).await.unwrap();
        assert_eq!(promoted.id, user.id);
        assert!(promoted.is_admin);
    }
}
