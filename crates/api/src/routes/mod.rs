pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                   create account + first session (public)
/// /auth/login                      login (public)
/// /auth/refresh                    rotate a session (public)
/// /auth/logout                     revoke the caller's session (requires auth)
/// /auth/sessions/{session_id}      revoke a session by id (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/auth", auth::router())
}
