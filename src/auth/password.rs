//! Password hashing and verification using Argon2id keyed with the server secret

use crate::{config::SecurityConfig, error::AppError};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use secrecy::{ExposeSecret, Secret};

/// Password hasher
///
/// The configured secret key is fed to Argon2 as its secret input, so a
/// stored hash can only be verified by a server holding the same key.
#[derive(Clone)]
pub struct PasswordHasher {
    secret_key: Secret<String>,
    params: Params,
}

impl PasswordHasher {
    /// Create hasher with explicit cost parameters
    pub fn new(
        secret_key: Secret<String>,
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, parallelism, None).map_err(|e| {
            AppError::Config(format!("Invalid Argon2 params: {}", e))
        })?;

        Ok(Self { secret_key, params })
    }

    /// Create hasher from the security section
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        Self::new(
            config.secret_key.clone(),
            config.password_hash_memory_kib,
            config.password_hash_iterations,
            config.password_hash_parallelism,
        )
    }

    fn argon2(&self) -> Result<Argon2<'_>, AppError> {
        let secret = self.secret_key.expose_secret();
        if secret.is_empty() {
            return Err(AppError::HashingFailure("secret key is empty".to_string()));
        }

        Argon2::new_with_secret(
            secret.as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
        .map_err(|e| AppError::HashingFailure(e.to_string()))
    }

    /// Hash a password
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::HashingFailure(e.to_string())
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a stored hash
    ///
    /// A mismatch is `Ok(false)`. Only a missing key is an error; an
    /// unparsable stored hash never matches.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let argon2 = self.argon2()?;

        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Stored password hash is unparsable: {:?}", e);
                return Ok(false);
            }
        };

        Ok(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok())
    }

    /// Validate password against the configured minimum length
    pub fn validate_password_policy(password: &str, config: &SecurityConfig) -> Result<(), AppError> {
        if password.chars().count() < config.password_min_length {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                config.password_min_length
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher(secret: &str) -> PasswordHasher {
        PasswordHasher::new(Secret::new(secret.to_string()), 1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher("test_secret_key_32_characters_long!");
        let hash = hasher.hash("p").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, "p");
        assert!(hasher.verify("p", &hash).unwrap());
    }

    #[test]
    fn test_verify_fails_with_wrong_password() {
        let hasher = hasher("test_secret_key_32_characters_long!");
        let hash = hasher.hash("TestPassword123!").unwrap();

        assert!(!hasher.verify("WrongPassword", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_different_each_time() {
        let hasher = hasher("test_secret_key_32_characters_long!");

        let hash1 = hasher.hash("TestPassword123!").unwrap();
        let hash2 = hasher.hash("TestPassword123!").unwrap();

        // 随机盐
        assert_ne!(hash1, hash2);
        assert!(hasher.verify("TestPassword123!", &hash1).unwrap());
        assert!(hasher.verify("TestPassword123!", &hash2).unwrap());
    }

    #[test]
    fn test_verify_requires_same_secret_key() {
        let hash = hasher("test_secret_key_32_characters_long!").hash("p").unwrap();
        let other = hasher("another_secret_key_32_characters_x");

        assert!(!other.verify("p", &hash).unwrap());
    }

    #[test]
    fn test_empty_secret_key_is_hashing_failure() {
        let hasher = hasher("");
        assert!(matches!(hasher.hash("p"), Err(AppError::HashingFailure(_))));
        assert!(matches!(hasher.verify("p", "x"), Err(AppError::HashingFailure(_))));
    }

    #[test]
    fn test_unparsable_hash_never_matches() {
        let hasher = hasher("test_secret_key_32_characters_long!");
        assert!(!hasher.verify("p", "U2FsdGVkX1+plain-aes-ciphertext").unwrap());
    }
}
