use std::sync::Arc;

use agora_core::auth::SessionAuthority;

use crate::auth::jwt::JwtSigner;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: agora_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Session lifecycle authority. Collaborators are injected at the
    /// composition root in `main` (or the test harness).
    pub authority: Arc<SessionAuthority>,
    /// Token signer, shared with the authority; the auth extractor uses it
    /// directly to validate access tokens.
    pub jwt: Arc<JwtSigner>,
}
