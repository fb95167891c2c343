//! Account HTTP Handlers
//!
//! Thin axum glue over [`SessionService`]. Handlers translate bodies and
//! cookies into service calls; every rule lives in the service.

use crate::error::AuthError;
use crate::extractors::{AuthUser, TokenCookies, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::middleware;
use crate::models::*;
use crate::service::SessionService;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

/// Shared session service state
pub type AppState = Arc<SessionService>;

// ============================================
// Route Builder
// ============================================

/// Create account routes
pub fn create_routes(service: Arc<SessionService>) -> Router {
    let public = Router::new()
        .route("/users/sign-up/", post(sign_up))
        .route("/users/sign-in/", post(sign_in))
        .route("/users/sign-out/", post(sign_out))
        .route("/users/token/refresh/", post(refresh_access));

    let protected = Router::new()
        .route("/users/me/", get(current_user))
        .route("/users/:id/withdraw/", delete(withdraw))
        .route_layer(axum_middleware::from_fn_with_state(
            service.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(service)
}

/// Decode a JSON body field by field; unparseable input becomes a 400
fn json_body<T>(payload: Result<Json<Value>, JsonRejection>) -> Result<T, AuthError>
where
    T: TryFrom<Value, Error = AuthError>,
{
    let Json(body) = payload
        .map_err(|rejection| AuthError::field("non_field_errors", rejection.body_text()))?;

    T::try_from(body)
}

fn token_cookie(
    service: &SessionService,
    name: &str,
    value: &str,
    max_age: i64,
) -> Result<HeaderValue, AuthError> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if service.config().cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| {
        tracing::error!("Invalid cookie header: {:?}", e);
        AuthError::Internal
    })
}

// ============================================
// Sign-up / Sign-in / Sign-out
// ============================================

/// POST /users/sign-up/
pub async fn sign_up(
    State(service): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let user = service.sign_up(json_body(payload)?).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /users/sign-in/
///
/// Returns the token pair in the body and as HttpOnly cookies
pub async fn sign_in(
    State(service): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let response = service.sign_in(json_body(payload)?).await?;

    let tokens = service.tokens();
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        token_cookie(
            &service,
            ACCESS_COOKIE,
            &response.token.access,
            tokens.access_ttl().num_seconds(),
        )?,
    );
    headers.append(
        SET_COOKIE,
        token_cookie(
            &service,
            REFRESH_COOKIE,
            &response.token.refresh,
            tokens.refresh_ttl().num_seconds(),
        )?,
    );

    Ok((StatusCode::OK, headers, Json(response)))
}

/// POST /users/sign-out/
///
/// Reads the token cookies and blacklists the refresh token
pub async fn sign_out(
    State(service): State<AppState>,
    cookies: TokenCookies,
) -> Result<impl IntoResponse, AuthError> {
    service
        .sign_out(SignOutRequest {
            access: cookies.access,
            refresh: cookies.refresh,
        })
        .await?;

    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, token_cookie(&service, ACCESS_COOKIE, "", 0)?);
    headers.append(SET_COOKIE, token_cookie(&service, REFRESH_COOKIE, "", 0)?);

    Ok((
        StatusCode::OK,
        headers,
        Json(MessageResponse::new("Successfully signed out")),
    ))
}

/// POST /users/token/refresh/
pub async fn refresh_access(
    State(service): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let response = service.refresh_access(json_body(payload)?).await?;

    Ok(Json(response))
}

// ============================================
// Authenticated
// ============================================

/// GET /users/me/
pub async fn current_user(
    State(service): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    let user = service.current_user(&claims).await?;

    Ok(Json(UserResponse::from(user)))
}

/// DELETE /users/:id/withdraw/
pub async fn withdraw(
    State(service): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AuthError> {
    service.withdraw(&claims, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
