//! Token issuer / verifier
//!
//! One strategy per deployment, chosen by `security.token_strategy`.

use super::{jwt::JwtService, session::SessionTokens};
use crate::{
    config::{SecurityConfig, TokenStrategy},
    error::AppError,
    models::user::User,
    repository::SessionStore,
};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Why a token was rejected
///
/// Only `Store` escapes to callers as-is; every other variant becomes
/// `AppError::Unauthorized`.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("unknown session token")]
    NotFound,

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Store(inner) => inner,
            _ => AppError::Unauthorized,
        }
    }
}

/// Identity recovered from a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: Uuid,
    /// Present for signed tokens; opaque tokens carry no role
    pub is_admin: Option<bool>,
}

pub enum TokenService {
    Signed(JwtService),
    Opaque(SessionTokens),
}

impl TokenService {
    pub fn from_config(
        config: &SecurityConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, AppError> {
        let service = match config.token_strategy {
            TokenStrategy::Signed => TokenService::Signed(JwtService::from_config(config)?),
            TokenStrategy::Opaque => {
                TokenService::Opaque(SessionTokens::new(sessions, config.token_ttl()))
            }
        };

        Ok(service)
    }

    pub fn strategy(&self) -> TokenStrategy {
        match self {
            TokenService::Signed(_) => TokenStrategy::Signed,
            TokenService::Opaque(_) => TokenStrategy::Opaque,
        }
    }

    pub async fn issue(&self, user: &User) -> Result<String, AppError> {
        match self {
            TokenService::Signed(jwt) => jwt.issue(user),
            TokenService::Opaque(sessions) => Ok(sessions.issue(user.id).await?),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        match self {
            TokenService::Signed(jwt) => {
                let claims = jwt.verify(token)?;
                Ok(VerifiedToken {
                    user_id: claims.user_id()?,
                    is_admin: Some(claims.is_admin),
                })
            }
            TokenService::Opaque(sessions) => Ok(VerifiedToken {
                user_id: sessions.verify(token).await?,
                is_admin: None,
            }),
        }
    }

    /// No-op for signed tokens, which stay valid until they expire
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        match self {
            TokenService::Signed(_) => Ok(()),
            TokenService::Opaque(sessions) => Ok(sessions.revoke(token).await?),
        }
    }
}
