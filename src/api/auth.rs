//! Authenticated-session binding.
//!
//! Sessions are opaque random tokens delivered in a cookie (with a bearer
//! header fallback for non-browser clients). Only a SHA-256 hash of the
//! token is stored. Every protected handler takes a [`User`] extractor,
//! which resolves the token to a live user row or rejects with 401.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::{AuthSession, DbPool, LogoutResponse, User, UserResponse};
use crate::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "gamelog_session";

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create an auth session for a user and return the clear-text token.
pub async fn create_auth_session(
    pool: &DbPool,
    user_id: &str,
    ttl_days: i64,
) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let now = chrono::Utc::now();
    let expires_at = (now + chrono::Duration::days(ttl_days)).to_rfc3339();

    let session_id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO auth_sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(&token_hash)
    .bind(&expires_at)
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(token)
}

/// Build the session cookie carrying a freshly issued token.
///
/// SameSite=None with Secure so the redirect-based login flow works when
/// the frontend is served from a different origin.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .build()
}

/// Extract the session token from request headers: cookie first, then a
/// `Bearer` Authorization header.
pub(crate) fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookies) = headers.get(header::COOKIE).and_then(|h| h.to_str().ok()) {
        for pair in cookies.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            if parts.next() == Some(SESSION_COOKIE) {
                if let Some(value) = parts.next() {
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Resolve a token to a live user. Returns `None` when the session is
/// missing or expired, or when the referenced user no longer exists.
pub async fn resolve_user(pool: &DbPool, token: &str) -> Result<Option<User>, sqlx::Error> {
    let token_hash = hash_token(token);
    let session: Option<AuthSession> = sqlx::query_as(
        "SELECT * FROM auth_sessions WHERE token_hash = ? AND expires_at > ?",
    )
    .bind(&token_hash)
    .bind(chrono::Utc::now().to_rfc3339())
    .fetch_optional(pool)
    .await?;

    let Some(session) = session else {
        return Ok(None);
    };

    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(pool)
        .await
}

/// Extractor for the current authenticated user.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;

        resolve_user(&state.db, &token)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Current user profile
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Invalidate the current session binding. Idempotent: logging out without
/// a session (or twice) still succeeds.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), ApiError> {
    if let Some(token) = extract_token(&headers) {
        sqlx::query("DELETE FROM auth_sessions WHERE token_hash = ?")
            .bind(hash_token(&token))
            .execute(&state.db)
            .await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(LogoutResponse { success: true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_hash_is_deterministic_and_not_identity() {
        let token = "abc123";
        assert_eq!(hash_token(token), hash_token(token));
        assert_ne!(hash_token(token), token);
        assert_eq!(hash_token(token).len(), 64);
    }

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
        assert_eq!(generate_token().len(), 64);
    }

    #[test]
    fn extracts_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; gamelog_session=tok123; theme=dark"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn falls_back_to_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok456"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("tok456"));
    }

    #[test]
    fn no_credentials_means_no_token() {
        let headers = HeaderMap::new();
        assert!(extract_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("gamelog_session="));
        assert!(extract_token(&headers).is_none());
    }

    #[tokio::test]
    async fn session_round_trip_and_logout() {
        let pool = crate::db::test_pool().await;
        let user_id = crate::db::insert_test_user(&pool, "g-1", "a@example.com").await;

        let token = create_auth_session(&pool, &user_id, 7).await.unwrap();
        let user = resolve_user(&pool, &token).await.unwrap().unwrap();
        assert_eq!(user.id, user_id);

        // Unknown token resolves to nothing
        assert!(resolve_user(&pool, "bogus").await.unwrap().is_none());

        // Invalidate and verify the binding is gone
        sqlx::query("DELETE FROM auth_sessions WHERE token_hash = ?")
            .bind(hash_token(&token))
            .execute(&pool)
            .await
            .unwrap();
        assert!(resolve_user(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_user_is_unauthenticated() {
        let pool = crate::db::test_pool().await;
        let user_id = crate::db::insert_test_user(&pool, "g-2", "b@example.com").await;
        let token = create_auth_session(&pool, &user_id, 7).await.unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&user_id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(resolve_user(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_rejected() {
        let pool = crate::db::test_pool().await;
        let user_id = crate::db::insert_test_user(&pool, "g-3", "c@example.com").await;
        let token = create_auth_session(&pool, &user_id, -1).await.unwrap();

        assert!(resolve_user(&pool, &token).await.unwrap().is_none());
    }
}
