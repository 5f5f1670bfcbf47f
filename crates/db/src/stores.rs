//! Postgres-backed implementations of the `agora-core` collaborator traits.
//!
//! Thin adapters over the repositories: convert rows to core records and map
//! `sqlx::Error` into [`AuthError::Infrastructure`] so the authority's error
//! taxonomy stays closed.

use agora_core::auth::{
    Account, AccountStore, AuthError, NewSession, RevokeOutcome, Session, SessionRotation,
    SessionStore,
};
use agora_core::types::{DbId, Timestamp};
use async_trait::async_trait;
use uuid::Uuid;

use crate::repositories::session_repo::RevokeResult;
use crate::repositories::{AccountRepo, SessionRepo};
use crate::DbPool;

/// [`SessionStore`] over the `sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: NewSession) -> Result<Session, AuthError> {
        let row = SessionRepo::create(&self.pool, &session)
            .await
            .map_err(AuthError::infrastructure)?;
        Ok(row.into())
    }

    async fn find_by_session_id(&self, session_id: Uuid) -> Result<Option<Session>, AuthError> {
        let row = SessionRepo::find_by_session_id(&self.pool, session_id)
            .await
            .map_err(AuthError::infrastructure)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Session>, AuthError> {
        let row = SessionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(AuthError::infrastructure)?;
        Ok(row.map(Into::into))
    }

    async fn rotate(
        &self,
        old_session_id: Uuid,
        expected_hash: &str,
        rotation: SessionRotation,
    ) -> Result<Option<Session>, AuthError> {
        let row = SessionRepo::rotate(&self.pool, old_session_id, expected_hash, &rotation)
            .await
            .map_err(AuthError::infrastructure)?;
        if row.is_none() {
            tracing::debug!(%old_session_id, "conditional rotate matched no row");
        }
        Ok(row.map(Into::into))
    }

    async fn revoke(&self, session_id: Uuid, at: Timestamp) -> Result<RevokeOutcome, AuthError> {
        let result = SessionRepo::revoke(&self.pool, session_id, at)
            .await
            .map_err(AuthError::infrastructure)?;
        Ok(match result {
            RevokeResult::Revoked => RevokeOutcome::Revoked,
            RevokeResult::AlreadyInactive => RevokeOutcome::AlreadyInactive,
            RevokeResult::NotFound => RevokeOutcome::NotFound,
        })
    }

    async fn revoke_all_for_user(&self, user_id: DbId, at: Timestamp) -> Result<u64, AuthError> {
        SessionRepo::revoke_all_for_user(&self.pool, user_id, at)
            .await
            .map_err(AuthError::infrastructure)
    }
}

/// [`AccountStore`] over the `accounts` table.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: DbPool,
}

impl PgAccountStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, user_id: DbId) -> Result<Option<Account>, AuthError> {
        let row = AccountRepo::find_by_id(&self.pool, user_id)
            .await
            .map_err(AuthError::infrastructure)?;
        Ok(row.map(|r| r.to_account()))
    }
}
