//! JWT token minting and verification
//!
//! Access and refresh tokens are HS256 JWTs sharing one claim layout; the
//! `token_type` claim keeps them from being used interchangeably.

use crate::config::AuthConfig;
use crate::error::TokenError;
use crate::models::{Claims, TokenPair, TokenType, User};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

/// Signs and verifies access/refresh tokens with the process-wide secret
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_audience(&[&config.jwt_audience]);
        validation.leeway = 0;

        Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            access_ttl: lifetime(config.access_token_expiration),
            refresh_ttl: lifetime(config.refresh_token_expiration),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Mint a fresh access/refresh pair for a user
    pub fn issue(&self, user: &User) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.mint(user.id, TokenType::Access)?,
            refresh: self.mint(user.id, TokenType::Refresh)?,
        })
    }

    /// Mint a single token of the given type
    pub fn mint(&self, user_id: i64, token_type: TokenType) -> Result<String, TokenError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        self.mint_with_ttl(user_id, token_type, ttl)
    }

    pub(crate) fn mint_with_ttl(
        &self,
        user_id: i64,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            tracing::error!(ttl = ttl.num_seconds(), "Token lifetime overflows the clock");
            TokenError::Invalid
        })?;
        let claims = Claims {
            sub: user_id.to_string(),
            token_type,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign token: {:?}", e);
            TokenError::Invalid
        })
    }

    /// Check signature, expiry and type tag, returning the claims
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.token_type != expected {
            tracing::debug!(
                expected = ?expected,
                actual = ?claims.token_type,
                "Token presented with wrong type"
            );
            return Err(TokenError::WrongType);
        }

        claims.user_id()?;
        Ok(claims)
    }
}

/// Seconds to a `Duration`, saturating instead of panicking out of range
fn lifetime(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(Duration::MAX)
}
