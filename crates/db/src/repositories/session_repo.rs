//! Repository for the `sessions` table.

use agora_core::auth::{NewSession, SessionRotation};
use agora_core::types::{DbId, Timestamp};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::session::SessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, user_id, refresh_token_hash, issued_at, expires_at, \
                        revoked_at, deleted_at, created_at, updated_at";

/// Outcome of [`SessionRepo::revoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeResult {
    Revoked,
    AlreadyInactive,
    NotFound,
}

/// Queries over session lineages. Sessions are never hard-deleted; lineages
/// end by revocation, soft-delete, or expiry, all of which leave the row.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a freshly issued session, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewSession) -> Result<SessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (session_id, user_id, refresh_token_hash, issued_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(input.session_id)
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(input.issued_at)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find the session currently carrying `session_id`. Rotated-away ids
    /// return `None`.
    pub async fn find_by_session_id(
        pool: &PgPool,
        session_id: Uuid,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE session_id = $1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a lineage by its primary key. The pk is stable across rotation,
    /// so this resolves the row no matter which `session_id` it carries.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Rotate a lineage in a single conditional UPDATE.
    ///
    /// The WHERE clause is the compare-and-swap: it only matches while the
    /// row still carries the old id and hash and is neither revoked nor
    /// deleted. Of two concurrent rotations at most one can match; the
    /// loser gets `None` and must treat the session as retired.
    pub async fn rotate(
        pool: &PgPool,
        old_session_id: Uuid,
        expected_hash: &str,
        rotation: &SessionRotation,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET
                session_id = $3,
                refresh_token_hash = $4,
                issued_at = $5,
                expires_at = $6,
                updated_at = NOW()
             WHERE session_id = $1
               AND refresh_token_hash = $2
               AND revoked_at IS NULL
               AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(old_session_id)
            .bind(expected_hash)
            .bind(rotation.session_id)
            .bind(&rotation.refresh_token_hash)
            .bind(rotation.issued_at)
            .bind(rotation.expires_at)
            .fetch_optional(pool)
            .await
    }

    /// Set `revoked_at` on a live session. Revoking an already-revoked or
    /// deleted session reports [`RevokeResult::AlreadyInactive`] so the
    /// caller can treat it as an idempotent no-op.
    pub async fn revoke(
        pool: &PgPool,
        session_id: Uuid,
        at: Timestamp,
    ) -> Result<RevokeResult, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = $2, updated_at = NOW()
             WHERE session_id = $1 AND revoked_at IS NULL AND deleted_at IS NULL",
        )
        .bind(session_id)
        .bind(at)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(RevokeResult::Revoked);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM sessions WHERE session_id = $1)")
                .bind(session_id)
                .fetch_one(pool)
                .await?;

        if exists {
            Ok(RevokeResult::AlreadyInactive)
        } else {
            Ok(RevokeResult::NotFound)
        }
    }

    /// Soft-delete a session. Returns `true` if the row was updated.
    pub async fn soft_delete(
        pool: &PgPool,
        session_id: Uuid,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET deleted_at = $2, updated_at = NOW()
             WHERE session_id = $1 AND deleted_at IS NULL",
        )
        .bind(session_id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every live session of a user (logout-everywhere, account
    /// suspension). Returns the count of revoked sessions.
    pub async fn revoke_all_for_user(
        pool: &PgPool,
        user_id: DbId,
        at: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = $2, updated_at = NOW()
             WHERE user_id = $1 AND revoked_at IS NULL AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
