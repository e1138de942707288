//! Account and session endpoints.
//!
//! | Method | Path                 | Gate   |
//! |--------|----------------------|--------|
//! | POST   | `/api/auth/signup`   | public |
//! | POST   | `/api/auth/signin`   | public |
//! | POST   | `/api/auth/signout`  | auth   |
//! | GET    | `/api/auth/session`  | auth   |
//! | GET    | `/api/auth/events`   | auth   |

use std::convert::Infallible;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};

use tillbook_core::validation::validate_sign_up;
use tillbook_core::User;

use crate::auth::{
    cleared_cookie, hash_password, session_cookie, verify_password, AuthEvent, AuthEventKind, AuthUser,
};
use crate::error::{ApiError, ApiResult};
use crate::SharedState;

pub fn public_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/signin", post(sign_in))
}

pub fn private_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/auth/signout", post(sign_out))
        .route("/api/auth/session", get(current_session))
        .route("/api/auth/events", get(auth_events))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Only checked on sign-up, and only when present.
    pub confirm_password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSession {
    pub user: User,
    pub session_id: String,
}

async fn sign_up(State(state): State<SharedState>, Json(body): Json<Credentials>) -> ApiResult<Response> {
    let email = validate_sign_up(&body.email, &body.password, body.confirm_password.as_deref())?;
    let hash = hash_password(&body.password)?;
    let user = state.db.users().create(&email, &hash).await?;

    info!(user_id = %user.id, "Account created");
    start_session(&state, user, StatusCode::CREATED).await
}

async fn sign_in(State(state): State<SharedState>, Json(body): Json<Credentials>) -> ApiResult<Response> {
    let Some(credentials) = state.db.users().find_credentials(&body.email).await? else {
        debug!("Sign-in for unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&body.password, &credentials.password_hash) {
        debug!(user_id = %credentials.user.id, "Sign-in with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    start_session(&state, credentials.user, StatusCode::OK).await
}

/// Issues a token, records the session and sets the cookie.
async fn start_session(state: &SharedState, user: User, status: StatusCode) -> ApiResult<Response> {
    let (token, claims) = state.jwt.issue(&user.id, &user.email)?;
    let expires_at = claims.expires_at();

    state.db.sessions().create(&claims.jti, &user.id, expires_at).await?;
    state
        .auth_events
        .publish(AuthEventKind::SignedIn, &user.id, &claims.jti);
    info!(user_id = %user.id, session_id = %claims.jti, "Signed in");

    let cookie = session_cookie(&token, state.jwt.access_lifetime_secs());
    let body = SessionResponse {
        token,
        expires_at,
        user,
    };
    Ok((status, AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body)).into_response())
}

async fn sign_out(State(state): State<SharedState>, Extension(user): Extension<AuthUser>) -> ApiResult<Response> {
    state.db.sessions().revoke(&user.session_id).await?;
    state
        .auth_events
        .publish(AuthEventKind::SignedOut, &user.user_id, &user.session_id);
    info!(user_id = %user.user_id, session_id = %user.session_id, "Signed out");

    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, cleared_cookie())]),
    )
        .into_response())
}

async fn current_session(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<CurrentSession>> {
    let account = state.db.users().get(&user.user_id).await?;
    Ok(Json(CurrentSession {
        user: account,
        session_id: user.session_id,
    }))
}

/// Auth state stream: the current state first, then every later sign-in or
/// sign-out of the same account.
async fn auth_events(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let current = AuthEvent {
        kind: AuthEventKind::SignedIn,
        user_id: user.user_id.clone(),
        session_id: user.session_id.clone(),
    };

    let user_id = user.user_id;
    let later = BroadcastStream::new(state.auth_events.subscribe()).filter_map(move |received| {
        // Lagged receivers just skip what they missed
        let event = received.ok().filter(|e| e.user_id == user_id);
        async move { event }
    });

    let events = stream::once(async move { current })
        .chain(later)
        .map(|event| Ok(auth_event(&event)));

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn auth_event(event: &AuthEvent) -> Event {
    Event::default()
        .event("auth")
        .json_data(event)
        .unwrap_or_else(|_| Event::default().event("auth"))
}
