//! Password hashing and verification using Argon2id
//!
//! Hashes are PHC strings carrying their own salt and parameters. Both
//! operations are CPU-bound by design, so the async entry points run them on
//! the blocking pool.

use crate::config::AuthConfig;
use crate::error::AuthError;

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Argon2id hasher with configured cost parameters
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt
    pub fn hash_blocking(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)?
            .to_string();

        Ok(hash)
    }

    /// Verify a password against a stored hash
    ///
    /// The parameters embedded in the hash win over the configured ones, so
    /// hashes written under an older cost setting keep verifying.
    pub fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)?;

        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password)).await?
    }

    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &hash)).await?
    }
}
