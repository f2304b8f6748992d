//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

/// 签名令牌默认有效期：5 天
pub const DEFAULT_SIGNED_TOKEN_TTL_SECS: u64 = 5 * 24 * 3600;
/// 会话令牌默认有效期：24 小时
pub const DEFAULT_SESSION_TOKEN_TTL_SECS: u64 = 24 * 3600;

const MIN_TOKEN_TTL_SECS: u64 = 60;
const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
    /// 允许的跨域来源（为空则不启用 CORS）
    #[serde(default)]
    pub cors_allowed_origins: Option<Vec<String>>,
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 存储后端: postgres, memory
    pub backend: StorageBackend,
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    #[serde(default)]
    pub url: Option<Secret<String>>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

/// 令牌策略（每个部署只能选择一种）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStrategy {
    /// 无状态签名令牌 (JWT)
    Signed,
    /// 不透明随机令牌，保存在会话存储中
    Opaque,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// 签名与密码哈希共用的密钥（必填，使用 Secret 包装）
    pub secret_key: Secret<String>,
    /// 令牌策略: signed, opaque
    pub token_strategy: TokenStrategy,
    /// 令牌有效期（秒），未设置时按策略取默认值
    #[serde(default)]
    pub token_ttl_secs: Option<u64>,
    /// Argon2 内存开销（KiB）
    pub password_hash_memory_kib: u32,
    /// Argon2 迭代次数
    pub password_hash_iterations: u32,
    /// Argon2 并行度
    pub password_hash_parallelism: u32,
    /// 密码最小长度
    pub password_min_length: usize,
}

impl SecurityConfig {
    /// 当前策略下的实际令牌有效期
    pub fn token_ttl(&self) -> Duration {
        let secs = self.token_ttl_secs.unwrap_or(match self.token_strategy {
            TokenStrategy::Signed => DEFAULT_SIGNED_TOKEN_TTL_SECS,
            TokenStrategy::Opaque => DEFAULT_SESSION_TOKEN_TTL_SECS,
        });
        Duration::from_secs(secs)
    }
}

/// 启动时确保存在的管理员账户
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeedConfig {
    pub email: String,
    pub username: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub admin: Option<AdminSeedConfig>,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置（secret_key 故意没有默认值）
        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("database.backend", "postgres")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.token_strategy", "signed")?
            .set_default("security.password_hash_memory_kib", 19456)?
            .set_default("security.password_hash_iterations", 2)?
            .set_default("security.password_hash_parallelism", 1)?
            .set_default("security.password_min_length", 1)?;

        // 从环境变量加载配置（前缀为 CATALOG_）
        settings = settings.add_source(
            Environment::with_prefix("CATALOG")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_allowed_origins")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库配置
        if self.database.backend == StorageBackend::Postgres {
            let has_url = self
                .database
                .url
                .as_ref()
                .is_some_and(|url| !url.expose_secret().trim().is_empty());
            if !has_url {
                return Err(ConfigError::Message(
                    "database.url is required for the postgres backend".to_string(),
                ));
            }
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        // 验证密钥（非空且至少 32 字符）
        let secret = self.security.secret_key.expose_secret();
        if secret.trim().is_empty() {
            return Err(ConfigError::Message("secret_key must not be empty".to_string()));
        }
        if secret.len() < 32 {
            return Err(ConfigError::Message(
                "secret_key must be at least 32 characters long".to_string(),
            ));
        }

        // 验证令牌有效期
        let ttl = self.security.token_ttl().as_secs();
        if !(MIN_TOKEN_TTL_SECS..=MAX_TOKEN_TTL_SECS).contains(&ttl) {
            return Err(ConfigError::Message(
                "token_ttl_secs must be between 60 and 2592000 (1 minute to 30 days)".to_string(),
            ));
        }

        // 验证 Argon2 参数
        let parallelism = self.security.password_hash_parallelism;
        if parallelism == 0 || parallelism > 16 {
            return Err(ConfigError::Message(
                "password_hash_parallelism must be between 1 and 16".to_string(),
            ));
        }
        if self.security.password_hash_iterations == 0 {
            return Err(ConfigError::Message(
                "password_hash_iterations must be >= 1".to_string(),
            ));
        }
        if self.security.password_hash_memory_kib < 8 * parallelism {
            return Err(ConfigError::Message(
                "password_hash_memory_kib must be >= 8 * password_hash_parallelism".to_string(),
            ));
        }

        if self.security.password_min_length == 0 || self.security.password_min_length > 128 {
            return Err(ConfigError::Message(
                "password_min_length must be between 1 and 128".to_string(),
            ));
        }

        // 验证管理员种子账户
        if let Some(admin) = &self.admin {
            if admin.email.trim().is_empty() || admin.password.expose_secret().is_empty() {
                return Err(ConfigError::Message(
                    "admin.email and admin.password must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
