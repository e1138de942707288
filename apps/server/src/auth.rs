//! JWT authentication module.
//!
//! Handles password hashing, session token issue/validation, and the gate
//! that keeps every private route behind a live session.
//!
//! ## Session Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/auth/signin                                                  │
//! │       │  argon2 verify                                                  │
//! │       ▼                                                                 │
//! │  JWT { sub: user id, jti: session id }  +  sessions row (jti)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Authorization: Bearer <jwt>   or   Cookie: token=<jwt>                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  require_auth: signature + expiry ──► sessions row still active?        │
//! │       ├── yes → AuthUser in request extensions                          │
//! │       └── no  → /api/*: 401 { redirect: "/login" }                      │
//! │                 pages : 303 → /login                                    │
//! │                                                                         │
//! │  POST /api/auth/signout revokes the row; the JWT is dead from then on.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, LOGIN_VIEW};
use crate::AppState;

/// Name of the cookie that carries the session token for page requests.
pub const TOKEN_COOKIE: &str = "token";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID; also the session row id
    pub jti: String,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    pub fn access_lifetime_secs(&self) -> i64 {
        self.access_lifetime_secs
    }

    /// Generate an access token for a new session.
    pub fn issue(&self, user_id: &str, email: &str) -> ApiResult<(String, Claims)> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok((token, claims))
    }

    /// Validate signature and expiry, and decode a token.
    pub fn validate(&self, token: &str) -> ApiResult<Claims> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::unauthenticated(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password for storage.
pub fn hash_password(password: &str) -> ApiResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against its stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Token Extraction
// =============================================================================

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

/// Finds the session token: `Authorization` header first, then the cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
    {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

/// `Set-Cookie` value that clears the session cookie.
pub fn cleared_cookie() -> String {
    format!("{TOKEN_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// =============================================================================
// Gate
// =============================================================================

/// The signed-in user, placed in request extensions by [`require_auth`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub session_id: String,
}

/// Resolves a token to a live session.
pub async fn authenticate(state: &AppState, token: &str) -> ApiResult<AuthUser> {
    let claims = state.jwt.validate(token)?;

    let active = state
        .db
        .sessions()
        .is_active(&claims.jti, &claims.sub, Utc::now())
        .await?;
    if !active {
        return Err(ApiError::unauthenticated("Session has ended"));
    }

    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        session_id: claims.jti,
    })
}

/// Middleware guarding every private route.
pub async fn require_auth(State(state): State<Arc<AppState>>, mut request: Request, next: Next) -> Response {
    let is_api = request.uri().path().starts_with("/api/");

    let result = match token_from_headers(request.headers()) {
        Some(token) => authenticate(&state, &token).await,
        None => Err(ApiError::unauthenticated("Missing session token")),
    };

    match result {
        Ok(user) => {
            trace!(user_id = %user.user_id, path = %request.uri().path(), "Authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e @ ApiError::Unauthenticated(_)) => {
            debug!(path = %request.uri().path(), reason = %e, "Rejected unauthenticated request");
            if is_api {
                e.into_response()
            } else {
                Redirect::to(LOGIN_VIEW).into_response()
            }
        }
        Err(e) => e.into_response(),
    }
}

// =============================================================================
// Auth State Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    #[serde(skip)]
    pub user_id: String,
    pub session_id: String,
}

/// Broadcast of sign-in and sign-out events, fanned out to
/// `/api/auth/events` subscribers of the same user.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        AuthEvents { tx }
    }

    pub fn publish(&self, kind: AuthEventKind, user_id: &str, session_id: &str) {
        // No subscribers is fine
        let _ = self.tx.send(AuthEvent {
            kind,
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let (token, issued) = manager.issue("user-001", "a@shop.in").unwrap();
        let claims = manager.validate(&token).unwrap();

        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.email, "a@shop.in");
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a".to_string(), 3600);
        let other = JwtManager::new("secret-b".to_string(), 3600);

        let (token, _) = issuer.issue("user-001", "a@shop.in").unwrap();
        assert!(matches!(other.validate(&token), Err(ApiError::Unauthenticated(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s leeway
        let manager = JwtManager::new("test-secret".to_string(), -120);
        let (token, _) = manager.issue("user-001", "a@shop.in").unwrap();
        assert!(manager.validate(&token).is_err());
    }

    #[test]
    fn test_password_hash_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn test_token_from_header_or_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
