//! Refresh token revocation ledger
//!
//! Sign-out blacklists the refresh token's `jti`. A blacklisted refresh token
//! never verifies again, even while its signature and expiry are still fine.

use crate::error::{AuthError, TokenError};
use crate::models::{Claims, TokenType};
use crate::store::RevocationStore;
use crate::token::TokenService;

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct RevocationLedger {
    store: Arc<dyn RevocationStore>,
    tokens: Arc<TokenService>,
}

impl RevocationLedger {
    pub fn new(store: Arc<dyn RevocationStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    /// Blacklist a currently valid refresh token
    ///
    /// Malformed, expired or wrong-type tokens are rejected. Storing the same
    /// `jti` twice keeps the original entry.
    pub async fn blacklist(&self, refresh: &str) -> Result<Claims, AuthError> {
        let claims = self.tokens.verify(refresh, TokenType::Refresh)?;
        let expires_at = claims.expires_at().ok_or(TokenError::Invalid)?;

        self.store
            .insert(claims.jti, claims.user_id()?, expires_at)
            .await?;

        tracing::info!(jti = %claims.jti, user_id = %claims.sub, "Refresh token blacklisted");
        Ok(claims)
    }

    /// Whether a verifiable refresh token has been blacklisted
    pub async fn is_blacklisted(&self, refresh: &str) -> Result<bool, AuthError> {
        let claims = self.tokens.verify(refresh, TokenType::Refresh)?;
        self.store.contains(claims.jti).await
    }

    /// Verify a refresh token and reject it if blacklisted
    pub async fn verify_refresh(&self, refresh: &str) -> Result<Claims, AuthError> {
        let claims = self.tokens.verify(refresh, TokenType::Refresh)?;

        if self.store.contains(claims.jti).await? {
            tracing::debug!(jti = %claims.jti, "Blacklisted refresh token presented");
            return Err(TokenError::Blacklisted.into());
        }

        Ok(claims)
    }

    /// Drop entries for tokens that have expired on their own
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let pruned = self.store.prune_expired(now).await?;
        if pruned > 0 {
            tracing::info!(pruned, "Pruned expired blacklist entries");
        }
        Ok(pruned)
    }
}
