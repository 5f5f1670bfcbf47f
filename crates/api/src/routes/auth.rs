//! Route definitions for the `/auth` resource.

use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST   /register                 -> register
/// POST   /login                    -> login
/// POST   /refresh                  -> refresh
/// POST   /logout                   -> logout (requires auth)
/// POST   /logout_all               -> logout_all (requires auth)
/// DELETE /sessions/{session_id}    -> revoke_session (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/logout_all", post(auth::logout_all))
        .route("/sessions/{session_id}", delete(auth::revoke_session))
}
