//! Repository for the `accounts` table.

use agora_core::types::DbId;
use sqlx::PgPool;

use crate::models::account::{AccountRow, CreateAccount};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, password_hash, status, \
                        deleted_at, created_at, updated_at";

/// Provides CRUD operations for accounts.
pub struct AccountRepo;

impl AccountRepo {
    /// Insert a new account, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateAccount) -> Result<AccountRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO accounts (username, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccountRow>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find an account by internal ID, including soft-deleted rows.
    ///
    /// Eligibility decisions belong to the core; this deliberately does not
    /// filter on `deleted_at`.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AccountRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, AccountRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live account by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<AccountRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM accounts WHERE username = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, AccountRow>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Mark an account suspended. Returns `true` if the row was updated.
    pub async fn suspend(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET status = 'suspended', updated_at = NOW()
             WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete an account. Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
