//! Account entity model and DTOs.

use agora_core::auth::{Account, AccountStatus};
use agora_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full account row from the `accounts` table.
///
/// Contains the password hash -- NEVER serialize this to API responses
/// directly. Use [`AccountResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// `'active'` or `'suspended'`, enforced by a CHECK constraint.
    pub status: String,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AccountRow {
    /// Project onto the core's eligibility view.
    pub fn to_account(&self) -> Account {
        let status = if self.status == "active" {
            AccountStatus::Active
        } else {
            AccountStatus::Suspended
        };
        Account {
            id: self.id,
            status,
            deleted_at: self.deleted_at,
        }
    }
}

/// Safe account representation for API responses (no password hash).
/// Timestamps serialize as ISO-8601 strings via chrono's serde impl.
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub status: String,
    pub created_at: Timestamp,
}

impl From<AccountRow> for AccountResponse {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// DTO for creating a new account.
#[derive(Debug)]
pub struct CreateAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
