//! Request extractors
//!
//! Token lookup for the HTTP boundary: `Authorization: Bearer` headers and the
//! `access` / `refresh` cookies set at sign-in.

use crate::error::AuthError;
use crate::models::Claims;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

pub const ACCESS_COOKIE: &str = "access";
pub const REFRESH_COOKIE: &str = "refresh";

/// Claims of the verified access token, injected by `middleware::require_auth`
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or(AuthError::Unauthorized)
    }
}

/// Token cookies as sent by the browser; absent cookies are empty strings
#[derive(Debug, Clone, Default)]
pub struct TokenCookies {
    pub access: String,
    pub refresh: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for TokenCookies
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(TokenCookies {
            access: cookie_value(&parts.headers, ACCESS_COOKIE).unwrap_or_default(),
            refresh: cookie_value(&parts.headers, REFRESH_COOKIE).unwrap_or_default(),
        })
    }
}

/// Find a cookie by name across all `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, val)| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

/// Bearer token from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .trim()
        .strip_prefix("Bearer ")
        .or_else(|| value.trim().strip_prefix("bearer "))?
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Access token from the header, falling back to the `access` cookie
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_value(headers, ACCESS_COOKIE))
}
