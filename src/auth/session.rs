//! Opaque session tokens
//!
//! A token is 32 random bytes, base64url encoded. Only its SHA-256 digest is
//! handed to the session store.

use super::token::TokenError;
use crate::repository::SessionStore;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

const TOKEN_BYTES: usize = 32;

/// Hash a raw token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct SessionTokens {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionTokens {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn issue(&self, user_id: Uuid) -> Result<String, TokenError> {
        let token = generate_token();
        self.store
            .set_with_ttl(&hash_token(&token), user_id, self.ttl)
            .await?;
        Ok(token)
    }

    pub async fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }

        let key = hash_token(token);
        let record = self.store.get(&key).await?.ok_or(TokenError::NotFound)?;

        if record.is_expired(Utc::now()) {
            // 过期记录顺手清掉
            self.store.delete(&key).await?;
            return Err(TokenError::Expired);
        }

        Ok(record.user_id)
    }

    /// Idempotent; revoking an unknown token succeeds
    pub async fn revoke(&self, token: &str) -> Result<(), TokenError> {
        let removed = self.store.delete(&hash_token(token)).await?;
        tracing::debug!(removed, "Session token revoked");
        Ok(())
    }
}
