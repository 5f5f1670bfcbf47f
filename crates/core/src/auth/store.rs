//! Collaborator traits injected into the session authority.
//!
//! All four seams are trait objects so the HTTP edge can wire the Postgres
//! and JWT implementations while tests substitute in-memory fakes. Every
//! method that touches storage or crypto is fallible; implementations map
//! their own failures into [`AuthError::Infrastructure`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::session::{Account, NewSession, Session, SessionRotation};
use crate::types::{DbId, Timestamp};

/// Outcome of a revocation attempt, distinguishing "nothing to do" from
/// "no such session".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The session was live and is now revoked.
    Revoked,
    /// The session exists but was already revoked or deleted. Treated as
    /// success by the authority (revocation is idempotent).
    AlreadyInactive,
    /// No session with that id exists.
    NotFound,
}

/// Persistence seam for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a freshly issued session.
    async fn insert(&self, session: NewSession) -> Result<Session, AuthError>;

    /// Look up the session currently carrying `session_id`. Retired ids
    /// (replaced by rotation) resolve to `None`.
    async fn find_by_session_id(&self, session_id: Uuid) -> Result<Option<Session>, AuthError>;

    /// Look up a lineage by its stable storage id. Unlike `session_id`,
    /// the storage id survives rotation, so this resolves the same lineage
    /// before and after a refresh.
    async fn find_by_id(&self, id: DbId) -> Result<Option<Session>, AuthError>;

    /// Atomically replace the rotation fields of the session identified by
    /// `old_session_id`, guarded by a compare-and-swap on the current
    /// `refresh_token_hash` and liveness markers. Returns `None` when the
    /// guard fails, i.e. a concurrent rotation or revocation won the race.
    async fn rotate(
        &self,
        old_session_id: Uuid,
        expected_hash: &str,
        rotation: SessionRotation,
    ) -> Result<Option<Session>, AuthError>;

    /// Set `revoked_at = at` unless the session is already inactive.
    async fn revoke(&self, session_id: Uuid, at: Timestamp) -> Result<RevokeOutcome, AuthError>;

    /// Revoke every live session belonging to `user_id`, returning how many
    /// were revoked. Already-inactive sessions are left untouched.
    async fn revoke_all_for_user(&self, user_id: DbId, at: Timestamp) -> Result<u64, AuthError>;
}

/// Account lookup seam used by refresh to re-validate eligibility.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, user_id: DbId) -> Result<Option<Account>, AuthError>;
}

/// Hashes refresh-token secret material for at-rest storage.
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, AuthError>;
    fn verify(&self, secret: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Claims carried by both access and refresh tokens. The issuer claim is
/// owned by the signer implementation; the core never sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    pub user_id: DbId,
    pub session_id: Uuid,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Signs and verifies compact signed tokens.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError>;

    /// Verify signature and issuer, returning the embedded claims.
    /// Malformed or signature-invalid input fails with
    /// [`AuthError::InvalidToken`] before any store access happens.
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError>;
}
