//! Passwords, sessions and the session-cookie extractor.
//!
//! Passwords are stored as bcrypt hashes. Hashing and checking run on the
//! blocking pool, never under the world lock. Sessions are random tokens
//! held in memory only, so a restart logs everyone out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use chrono::{DateTime, TimeDelta, Utc};
use stronghold_types::UserId;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// Cheapest work factor bcrypt accepts.
pub const MIN_PASSWORD_COST: u32 = 4;

/// Hash a password with bcrypt at `cost`, with a fresh random salt.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if `cost` is out of range or the
/// hashing task dies.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored hash. Malformed hashes never match.
pub async fn verify_password(password: String, stored: String) -> bool {
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &stored)).await {
        Ok(Ok(matched)) => matched,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "stored password hash is unreadable");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "password check task failed");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Session {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// In-memory session table keyed by token.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: TimeDelta,
}

impl SessionStore {
    /// Create an empty table whose sessions live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Session lifetime in whole seconds, for the cookie `Max-Age`.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Start a session for `user_id`, returning its token.
    pub async fn create(&self, user_id: UserId) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.expires_at > Utc::now());
        sessions.insert(
            token.clone(),
            Session {
                user_id,
                expires_at,
            },
        );
        token
    }

    /// The user a live token belongs to. Expired tokens are dropped.
    pub async fn resolve(&self, token: &str) -> Option<UserId> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return None,
                Some(session) if session.expires_at > now => return Some(session.user_id),
                Some(_) => {}
            }
        }
        self.sessions.write().await.remove(token);
        tracing::debug!("expired session removed");
        None
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

}

// ---------------------------------------------------------------------------
// Cookies
// ---------------------------------------------------------------------------

/// The value of the session cookie, if the request carries one.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_owned())
}

/// `Set-Cookie` value that stores `token` for `max_age_secs`.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// The logged-in user behind a request.
///
/// Extracting it rejects the request with [`ApiError::Unauthorized`] when
/// the session cookie is missing, unknown or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let user_id = state
            .sessions
            .resolve(&token)
            .await
            .ok_or(ApiError::Unauthorized)?;
        Ok(Self(user_id))
    }
}
