//! Session and account records, liveness rules, and rotation DTOs.

use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::types::{DbId, Timestamp};

/// A refresh session. One row per rotation lineage; rotation overwrites the
/// identifying fields in place rather than inserting a new row.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Stable storage id of the lineage, assigned on insert and unchanged
    /// by rotation. Used for audit lookups, never embedded in tokens.
    pub id: DbId,
    /// Opaque identifier embedded in every token issued for this lineage.
    /// Replaced on every rotation; the retired id never validates again.
    pub session_id: Uuid,
    /// Owning account. Immutable for the life of the session.
    pub user_id: DbId,
    /// Hash of the current refresh token's secret material. The raw token
    /// is never stored.
    pub refresh_token_hash: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    /// Once set, the session is permanently invalid regardless of expiry.
    pub revoked_at: Option<Timestamp>,
    /// Soft-delete marker. Same effect on validation as revocation,
    /// distinguished for audit and retention.
    pub deleted_at: Option<Timestamp>,
}

impl Session {
    /// A session is usable iff it is neither revoked nor deleted and `now`
    /// is strictly before `expires_at`.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.revoked_at.is_none() && self.deleted_at.is_none() && now < self.expires_at
    }

    /// Check liveness, short-circuiting on the first failure in the fixed
    /// order: revoked, deleted, expired. `now == expires_at` counts as
    /// expired (the boundary is exclusive on the valid side).
    pub fn ensure_live(&self, now: Timestamp) -> Result<(), AuthError> {
        if self.revoked_at.is_some() {
            return Err(AuthError::SessionRevoked);
        }
        if self.deleted_at.is_some() {
            return Err(AuthError::SessionDeleted);
        }
        if now >= self.expires_at {
            return Err(AuthError::SessionExpired);
        }
        Ok(())
    }
}

/// Fields persisted when a session is first issued.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: Uuid,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Replacement fields applied by a successful rotation. The owning user and
/// the revocation markers are never touched by rotation.
#[derive(Debug, Clone)]
pub struct SessionRotation {
    pub session_id: Uuid,
    pub refresh_token_hash: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Account eligibility view used by refresh to re-validate the owner.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: DbId,
    pub status: AccountStatus,
    pub deleted_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
}

impl Account {
    /// Eligible iff active and not soft-deleted.
    pub fn is_eligible(&self) -> bool {
        self.status == AccountStatus::Active && self.deleted_at.is_none()
    }
}
