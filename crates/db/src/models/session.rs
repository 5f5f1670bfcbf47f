//! Session row model for the `sessions` table.

use agora_core::auth::Session;
use agora_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// A session lineage row. `session_id` rotates; the primary key `id` is
/// stable for the life of the lineage.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: DbId,
    pub session_id: Uuid,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            session_id: row.session_id,
            user_id: row.user_id,
            refresh_token_hash: row.refresh_token_hash,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            deleted_at: row.deleted_at,
        }
    }
}
