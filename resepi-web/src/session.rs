//! Session cookie handling and authentication extractors
//!
//! `MaybeUser` never rejects. `RequireUser` redirects anonymous visitors
//! to `/login?next=<path>`. `RequireEditor` and `RequireAdmin` also
//! answer 403 for signed-in users without the role.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use resepi_common::db::{Role, User};

use crate::db::users::user_for_session;
use crate::error::{ApiError, PageError};
use crate::render;
use crate::AppState;

pub const SESSION_COOKIE: &str = "resepi_session";

/// Raw session token from the `Cookie` header
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value starting a session
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

/// Append a `Set-Cookie` header to a response
pub fn with_cookie(mut response: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

/// Only local absolute paths are accepted as post-login targets
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => "/".to_string(),
    }
}

/// Why an authentication extractor refused the request
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in; carries the path to come back to
    Login(String),
    Forbidden,
    Internal(ApiError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Login(next) => {
                Redirect::to(&format!("/login?next={}", urlencoding::encode(&next))).into_response()
            }
            AuthRejection::Forbidden => (
                StatusCode::FORBIDDEN,
                Html(render::error_page(
                    403,
                    "Akses ditolak",
                    "Akaun anda tidak mempunyai kebenaran untuk halaman ini.",
                )),
            )
                .into_response(),
            AuthRejection::Internal(err) => PageError(err).into_response(),
        }
    }
}

/// Signed-in user, if any
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Several extractors on one request share a single lookup
        if let Some(cached) = parts.extensions.get::<MaybeUser>() {
            return Ok(cached.clone());
        }

        let user = match session_token(&parts.headers) {
            Some(token) => user_for_session(&state.db, &token)
                .await
                .map_err(|e| AuthRejection::Internal(e.into()))?,
            None => None,
        };

        let extracted = MaybeUser(user);
        parts.extensions.insert(extracted.clone());
        Ok(extracted)
    }
}

async fn require_role(parts: &mut Parts, state: &AppState, minimum: Role) -> Result<User, AuthRejection> {
    let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;

    let Some(user) = user else {
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        return Err(AuthRejection::Login(next));
    };

    if user.role < minimum {
        return Err(AuthRejection::Forbidden);
    }
    Ok(user)
}

/// Any signed-in user
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Reader).await.map(RequireUser)
    }
}

/// Editor or admin
#[derive(Debug, Clone)]
pub struct RequireEditor(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireEditor {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Editor).await.map(RequireEditor)
    }
}

#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(RequireAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; resepi_session=abc123; x=1"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("resepi_session="));
        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("tok", 3600);
        assert_eq!(cookie, "resepi_session=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600");
        assert!(clear_session_cookie().ends_with("Max-Age=0"));
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/recipes/rendang")), "/recipes/rendang");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
