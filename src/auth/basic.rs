//! HTTP Basic credentials for sign-in

use crate::{error::AppError, models::user::normalize_email};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;

pub struct BasicCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl BasicCredentials {
    /// Parse `Authorization: Basic base64(email:password)`
    ///
    /// The password may itself contain ':'; only the first one separates.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let (scheme, encoded) = value.trim().split_once(' ').ok_or(AppError::Unauthorized)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(AppError::Unauthorized);
        }

        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AppError::Unauthorized)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AppError::Unauthorized)?;

        let (email, password) = decoded.split_once(':').ok_or(AppError::Unauthorized)?;
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Unauthorized);
        }

        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}
