//! Authentication Middleware
//!
//! Verifies the access token once per request and stores its claims in the
//! request extensions for the `AuthUser` extractor.

use crate::error::AuthError;
use crate::extractors::access_token;
use crate::handlers::AppState;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Require a valid access token (Bearer header or `access` cookie)
pub async fn require_auth(
    State(service): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = access_token(req.headers()).ok_or(AuthError::Unauthorized)?;

    let claims = service.authenticate(&token).map_err(|e| {
        tracing::debug!("Access token rejected: {:?}", e);
        e
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
