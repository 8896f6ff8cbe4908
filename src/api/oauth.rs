//! Google identity resolution.
//!
//! One token exchange, one profile fetch, no retries. The local user row
//! is written and the auth session bound only after the profile is fully
//! resolved, so a failed login leaves no partial state behind.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use super::auth;
use super::error::ApiError;
use crate::config::GoogleOAuthConfig;
use crate::db::{DbPool, User};
use crate::AppState;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("token exchange failed: {0}")]
    AuthExchange(String),
    #[error("unusable provider profile: {0}")]
    InvalidProfile(String),
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::AuthExchange(msg) => ApiError::auth_exchange(msg),
            ProviderError::InvalidProfile(msg) => ApiError::invalid_profile(msg),
        }
    }
}

/// A provider profile with the fields this backend requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// URL-encode a string for use in query parameters
fn url_encode(s: &str) -> String {
    let mut encoded = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    encoded
}

fn authorization_url(oauth: &GoogleOAuthConfig) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        GOOGLE_AUTH_URL,
        url_encode(&oauth.client_id),
        url_encode(&oauth.redirect_uri),
        url_encode("openid email profile"),
    )
}

fn google_config(state: &AppState) -> Result<&GoogleOAuthConfig, ApiError> {
    state
        .config
        .google
        .as_ref()
        .ok_or_else(|| ApiError::internal("Google OAuth is not configured"))
}

/// Redirect the browser to Google's consent screen
pub async fn login(State(state): State<Arc<AppState>>) -> Result<Redirect, ApiError> {
    let oauth = google_config(&state)?;
    Ok(Redirect::to(&authorization_url(oauth)))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

/// Exchange an authorization code for an access token
async fn exchange_code(oauth: &GoogleOAuthConfig, code: &str) -> Result<String, ProviderError> {
    let client = reqwest::Client::new();
    let response = client
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", oauth.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| ProviderError::AuthExchange(format!("token request failed: {e}")))?;

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::AuthExchange(format!("bad token response: {e}")))?;

    match token.access_token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(ProviderError::AuthExchange(
            "no access token in provider response".to_string(),
        )),
    }
}

/// Fetch the provider profile with a bearer token
async fn fetch_profile(access_token: &str) -> Result<ResolvedProfile, ProviderError> {
    let client = reqwest::Client::new();
    let profile: GoogleProfile = client
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| ProviderError::AuthExchange(format!("profile request failed: {e}")))?
        .json()
        .await
        .map_err(|e| ProviderError::InvalidProfile(format!("bad profile response: {e}")))?;

    resolve_profile(profile)
}

/// Check the raw profile for the fields identity resolution depends on.
fn resolve_profile(profile: GoogleProfile) -> Result<ResolvedProfile, ProviderError> {
    let subject = match profile.id {
        Some(id) if !id.is_empty() => id,
        _ => {
            return Err(ProviderError::InvalidProfile(
                "profile has no subject id".to_string(),
            ))
        }
    };
    let email = match profile.email {
        Some(email) if !email.is_empty() => email,
        _ => {
            return Err(ProviderError::InvalidProfile(
                "profile has no email".to_string(),
            ))
        }
    };

    Ok(ResolvedProfile {
        subject,
        email,
        name: profile.name,
        avatar_url: profile.picture,
    })
}

/// Create the user on first login, refresh name/avatar on re-login.
/// A single upsert statement; google_id and email stay immutable.
pub async fn upsert_user(pool: &DbPool, profile: &ResolvedProfile) -> Result<User, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query_as(
        r#"
        INSERT INTO users (id, google_id, email, name, avatar_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(google_id) DO UPDATE SET
            name = excluded.name,
            avatar_url = excluded.avatar_url,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&profile.subject)
    .bind(&profile.email)
    .bind(profile.name.clone().unwrap_or_default())
    .bind(&profile.avatar_url)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await
}

/// OAuth callback: resolve the identity, bind a session, set the cookie.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let oauth = google_config(&state)?;

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::auth_exchange("Missing authorization code"))?;

    let access_token = exchange_code(oauth, &code).await?;
    let profile = fetch_profile(&access_token).await?;

    let user = upsert_user(&state.db, &profile).await?;
    tracing::info!(user_id = %user.id, "login completed");

    let token = auth::create_auth_session(&state.db, &user.id, state.config.auth.session_ttl_days)
        .await?;
    let jar = jar.add(auth::session_cookie(token));

    Ok((
        jar,
        Redirect::to(&state.config.auth.post_login_redirect),
    ))
}
