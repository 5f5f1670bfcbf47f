//! Handlers for the `/auth` resource (register, login, refresh, logout,
//! session revocation).
//!
//! These are thin: identity establishment (password checks) and DTO mapping
//! live here; the session lifecycle itself is owned by the injected
//! `SessionAuthority`. Timestamps serialize as ISO-8601 strings at this
//! boundary; the core keeps proper timestamp types internally.

use agora_core::auth::{AuthError, IssuedTokens};
use agora_core::error::CoreError;
use agora_core::types::Timestamp;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agora_db::models::account::{AccountResponse, AccountRow, CreateAccount};
use agora_db::repositories::AccountRepo;

use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair returned by refresh. Expiry timestamps let clients schedule
/// renewal ahead of time.
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: Timestamp,
    pub expires_at: Timestamp,
}

impl From<IssuedTokens> for TokenPairResponse {
    fn from(issued: IssuedTokens) -> Self {
        Self {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            access_expires_at: issued.access_expires_at,
            expires_at: issued.expires_at,
        }
    }
}

/// Successful authentication response returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPairResponse,
    pub user: AccountResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create a new account and issue its first session.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    validate_password_strength(&input.password)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    // Unique-constraint violations on username/email surface as 409.
    let account = AccountRepo::create(
        &state.pool,
        &CreateAccount {
            username: input.username,
            email: input.email,
            password_hash,
        },
    )
    .await?;

    let issued = state.authority.issue(account.id).await?;
    Ok((StatusCode::CREATED, Json(auth_response(issued, account))))
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Returns access and refresh tokens.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Find the account. Same message for unknown user and bad password.
    let account = AccountRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            ))
        })?;

    // 2. Eligibility gate: issuing a session for an ineligible account is
    //    the caller's responsibility to prevent.
    if !account.to_account().is_eligible() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is suspended".into(),
        )));
    }

    // 3. Verify password.
    let password_valid = verify_password(&input.password, &account.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        )));
    }

    // 4. Issue tokens and persist the session.
    let issued = state.authority.issue(account.id).await?;
    Ok(Json(auth_response(issued, account)))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for a new access + refresh pair, rotating
/// the underlying session. Any lifecycle failure surfaces as a uniform 401.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<TokenPairResponse>> {
    let issued = state.authority.refresh(&input.refresh_token).await?;
    Ok(Json(issued.into()))
}

/// POST /api/v1/auth/logout
///
/// Revoke the calling token's session. Returns 204 No Content. Idempotent:
/// logging out of an already-rotated or revoked session is still a success.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    match state.authority.revoke(auth_user.session_id).await {
        // The sid of an older access token may have been retired by a
        // rotation in the meantime; there is nothing left to revoke.
        Ok(()) | Err(AuthError::SessionNotFound) => Ok(StatusCode::NO_CONTENT),
        Err(other) => Err(other.into()),
    }
}

/// POST /api/v1/auth/logout_all
///
/// Revoke every live session of the calling user (logout everywhere).
/// Returns 204 No Content even when nothing was live.
pub async fn logout_all(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<StatusCode> {
    state.authority.revoke_all(auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/auth/sessions/{session_id}
///
/// Revoke a session by id (self-service "sign out that device"). 404 only
/// when no session carries the id; revoking twice is a no-op.
pub async fn revoke_session(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    match state.authority.revoke(session_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(AuthError::SessionNotFound) => Err(AppError::NotFound("session")),
        Err(other) => Err(other.into()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn auth_response(issued: IssuedTokens, account: AccountRow) -> AuthResponse {
    AuthResponse {
        tokens: issued.into(),
        user: account.into(),
    }
}
