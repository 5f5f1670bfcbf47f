//! [`SessionAuthority`] -- issuance, refresh-with-rotation, and revocation
//! of access/refresh token pairs.
//!
//! Each operation is an independent unit of work: no background sweeps, no
//! in-process shared state. Expiry is detected lazily at the next refresh
//! attempt, and concurrent refreshes of one lineage are serialized by the
//! store's conditional rotate.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::session::{NewSession, Session, SessionRotation};
use crate::auth::store::{
    AccountStore, RevokeOutcome, SecretHasher, SessionStore, TokenClaims, TokenSigner,
};
use crate::types::{DbId, Timestamp};

/// Token lifetime policy.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// Access token lifetime (default: 15 minutes).
    pub access_ttl: Duration,
    /// Refresh token lifetime, which is also the session validity window
    /// (default: 7 days).
    pub refresh_ttl: Duration,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }
}

/// A freshly issued access/refresh pair plus the backing session record.
/// Expiry timestamps are returned so clients can schedule renewal.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: Timestamp,
    pub expires_at: Timestamp,
    pub session: Session,
}

/// Owns the session lifecycle. All collaborators are injected; the
/// composition root (the API binary) decides their lifetimes.
pub struct SessionAuthority {
    sessions: Arc<dyn SessionStore>,
    accounts: Arc<dyn AccountStore>,
    hasher: Arc<dyn SecretHasher>,
    signer: Arc<dyn TokenSigner>,
    policy: AuthPolicy,
}

impl SessionAuthority {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountStore>,
        hasher: Arc<dyn SecretHasher>,
        signer: Arc<dyn TokenSigner>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            sessions,
            accounts,
            hasher,
            signer,
            policy,
        }
    }

    /// Issue a new session for an already-authenticated account.
    ///
    /// Eligibility of the account (not suspended, not deleted) is the
    /// caller's responsibility; login and registration check it before
    /// calling this. The only failures here are infrastructure errors.
    pub async fn issue(&self, user_id: DbId) -> Result<IssuedTokens, AuthError> {
        let now = Utc::now();
        let session_id = Uuid::new_v4();

        let (access_token, refresh_token, access_expires_at, expires_at) =
            self.sign_pair(user_id, session_id, now)?;

        let refresh_token_hash = self.hasher.hash(&refresh_token)?;

        let session = self
            .sessions
            .insert(NewSession {
                session_id,
                user_id,
                refresh_token_hash,
                issued_at: now,
                expires_at,
            })
            .await?;

        tracing::debug!(user_id, %session_id, "issued new session");

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            access_expires_at,
            expires_at,
            session,
        })
    }

    /// Exchange a refresh token for a new pair, rotating the session.
    ///
    /// Checks run in a fixed order and short-circuit on the first failure:
    /// signature, session lookup, hash match, revoked, deleted, expired,
    /// account eligibility. On success the old session id is retired
    /// atomically; presenting the same token again fails with
    /// [`AuthError::SessionNotFound`].
    pub async fn refresh(&self, presented: &str) -> Result<IssuedTokens, AuthError> {
        // Signature and issuer first; malformed input never reaches the store.
        let claims = self.signer.verify(presented)?;

        let session = self
            .sessions
            .find_by_session_id(claims.session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if !self.hasher.verify(presented, &session.refresh_token_hash)? {
            tracing::warn!(
                session_id = %session.session_id,
                "refresh token hash mismatch, possible replay of a retired token"
            );
            return Err(AuthError::TokenMismatch);
        }

        let now = Utc::now();
        session.ensure_live(now)?;

        let account = self
            .accounts
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthError::AccountNotEligible)?;
        if !account.is_eligible() {
            return Err(AuthError::AccountNotEligible);
        }

        // Rotation: a new identity for the lineage, applied as a single
        // conditional write keyed on the old id and hash. If a concurrent
        // refresh already rotated the row, the guard fails and this attempt
        // observes the session as retired.
        let new_session_id = Uuid::new_v4();
        let (access_token, refresh_token, access_expires_at, expires_at) =
            self.sign_pair(session.user_id, new_session_id, now)?;
        let refresh_token_hash = self.hasher.hash(&refresh_token)?;

        let rotated = self
            .sessions
            .rotate(
                session.session_id,
                &session.refresh_token_hash,
                SessionRotation {
                    session_id: new_session_id,
                    refresh_token_hash,
                    issued_at: now,
                    expires_at,
                },
            )
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        tracing::debug!(
            user_id = session.user_id,
            old_session_id = %session.session_id,
            new_session_id = %rotated.session_id,
            "rotated session"
        );

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            access_expires_at,
            expires_at,
            session: rotated,
        })
    }

    /// Revoke a session by id. Idempotent: revoking an already-revoked or
    /// deleted session succeeds without effect. Fails with
    /// [`AuthError::SessionNotFound`] only when no session carries the id.
    pub async fn revoke(&self, session_id: Uuid) -> Result<(), AuthError> {
        match self.sessions.revoke(session_id, Utc::now()).await? {
            RevokeOutcome::Revoked => {
                tracing::info!(%session_id, "session revoked");
                Ok(())
            }
            RevokeOutcome::AlreadyInactive => Ok(()),
            RevokeOutcome::NotFound => Err(AuthError::SessionNotFound),
        }
    }

    /// Revoke every live session of a user at once (logout everywhere).
    /// Returns the number of sessions revoked; zero is a success, not an
    /// error -- the user may simply have nothing live.
    pub async fn revoke_all(&self, user_id: DbId) -> Result<u64, AuthError> {
        let revoked = self
            .sessions
            .revoke_all_for_user(user_id, Utc::now())
            .await?;
        if revoked > 0 {
            tracing::info!(user_id, revoked, "revoked all sessions for user");
        }
        Ok(revoked)
    }

    /// Sign an access/refresh pair bound to `session_id`.
    fn sign_pair(
        &self,
        user_id: DbId,
        session_id: Uuid,
        now: Timestamp,
    ) -> Result<(String, String, Timestamp, Timestamp), AuthError> {
        let access_expires_at = now + self.policy.access_ttl;
        let expires_at = now + self.policy.refresh_ttl;

        let access_token = self.signer.sign(&TokenClaims {
            user_id,
            session_id,
            issued_at: now,
            expires_at: access_expires_at,
        })?;
        let refresh_token = self.signer.sign(&TokenClaims {
            user_id,
            session_id,
            issued_at: now,
            expires_at,
        })?;

        Ok((access_token, refresh_token, access_expires_at, expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{Account, AccountStatus};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // In-memory collaborators
    // -----------------------------------------------------------------------

    /// Session store backed by a mutex-guarded map. The mutex makes
    /// `rotate`'s compare-and-swap genuinely atomic, mirroring the
    /// conditional UPDATE the Postgres store issues.
    #[derive(Default)]
    struct MemorySessionStore {
        rows: Mutex<HashMap<Uuid, Session>>,
        lookups: AtomicUsize,
        next_id: AtomicI64,
    }

    impl MemorySessionStore {
        fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }

        /// Test hook: overwrite a stored session in place.
        fn put(&self, session: Session) {
            self.rows
                .lock()
                .unwrap()
                .insert(session.session_id, session);
        }

        fn get(&self, session_id: Uuid) -> Option<Session> {
            self.rows.lock().unwrap().get(&session_id).cloned()
        }
    }

    #[async_trait]
    impl SessionStore for MemorySessionStore {
        async fn insert(&self, input: NewSession) -> Result<Session, AuthError> {
            let session = Session {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                session_id: input.session_id,
                user_id: input.user_id,
                refresh_token_hash: input.refresh_token_hash,
                issued_at: input.issued_at,
                expires_at: input.expires_at,
                revoked_at: None,
                deleted_at: None,
            };
            self.rows
                .lock()
                .unwrap()
                .insert(session.session_id, session.clone());
            Ok(session)
        }

        async fn find_by_session_id(
            &self,
            session_id: Uuid,
        ) -> Result<Option<Session>, AuthError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().unwrap().get(&session_id).cloned())
        }

        async fn find_by_id(&self, id: DbId) -> Result<Option<Session>, AuthError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|s| s.id == id)
                .cloned())
        }

        async fn rotate(
            &self,
            old_session_id: Uuid,
            expected_hash: &str,
            rotation: SessionRotation,
        ) -> Result<Option<Session>, AuthError> {
            let mut rows = self.rows.lock().unwrap();
            let Some(current) = rows.get(&old_session_id) else {
                return Ok(None);
            };
            // Guard mirrors the conditional UPDATE: same hash, still live.
            if current.refresh_token_hash != expected_hash
                || current.revoked_at.is_some()
                || current.deleted_at.is_some()
            {
                return Ok(None);
            }
            let mut rotated = rows.remove(&old_session_id).unwrap();
            rotated.session_id = rotation.session_id;
            rotated.refresh_token_hash = rotation.refresh_token_hash;
            rotated.issued_at = rotation.issued_at;
            rotated.expires_at = rotation.expires_at;
            rows.insert(rotated.session_id, rotated.clone());
            Ok(Some(rotated))
        }

        async fn revoke(
            &self,
            session_id: Uuid,
            at: Timestamp,
        ) -> Result<RevokeOutcome, AuthError> {
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(&session_id) {
                None => Ok(RevokeOutcome::NotFound),
                Some(row) if row.revoked_at.is_some() || row.deleted_at.is_some() => {
                    Ok(RevokeOutcome::AlreadyInactive)
                }
                Some(row) => {
                    row.revoked_at = Some(at);
                    Ok(RevokeOutcome::Revoked)
                }
            }
        }

        async fn revoke_all_for_user(
            &self,
            user_id: DbId,
            at: Timestamp,
        ) -> Result<u64, AuthError> {
            let mut rows = self.rows.lock().unwrap();
            let mut revoked = 0;
            for row in rows.values_mut() {
                if row.user_id == user_id && row.revoked_at.is_none() && row.deleted_at.is_none() {
                    row.revoked_at = Some(at);
                    revoked += 1;
                }
            }
            Ok(revoked)
        }
    }

    #[derive(Default)]
    struct MemoryAccountStore {
        accounts: Mutex<HashMap<DbId, Account>>,
    }

    impl MemoryAccountStore {
        fn with_active(user_id: DbId) -> Self {
            let store = Self::default();
            store.put(Account {
                id: user_id,
                status: AccountStatus::Active,
                deleted_at: None,
            });
            store
        }

        fn put(&self, account: Account) {
            self.accounts.lock().unwrap().insert(account.id, account);
        }
    }

    #[async_trait]
    impl AccountStore for MemoryAccountStore {
        async fn find_by_id(&self, user_id: DbId) -> Result<Option<Account>, AuthError> {
            Ok(self.accounts.lock().unwrap().get(&user_id).cloned())
        }
    }

    /// Deterministic prefix "hasher". Real salting lives in the api crate;
    /// the authority only cares that hash(x) round-trips through verify.
    struct PlainHasher;

    impl SecretHasher for PlainHasher {
        fn hash(&self, secret: &str) -> Result<String, AuthError> {
            Ok(format!("h:{secret}"))
        }

        fn verify(&self, secret: &str, hash: &str) -> Result<bool, AuthError> {
            Ok(hash == format!("h:{secret}"))
        }
    }

    /// Fake signer encoding claims as `tok/<user>/<sid>/<iat>/<exp>`.
    /// Anything not in that shape fails with `InvalidToken`, exactly like a
    /// JWT with a bad signature would.
    struct FakeSigner;

    impl TokenSigner for FakeSigner {
        fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
            Ok(format!(
                "tok/{}/{}/{}/{}",
                claims.user_id,
                claims.session_id,
                claims.issued_at.timestamp_micros(),
                claims.expires_at.timestamp_micros(),
            ))
        }

        fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
            let parts: Vec<&str> = token.split('/').collect();
            if parts.len() != 5 || parts[0] != "tok" {
                return Err(AuthError::InvalidToken);
            }
            let user_id = parts[1].parse().map_err(|_| AuthError::InvalidToken)?;
            let session_id = parts[2].parse().map_err(|_| AuthError::InvalidToken)?;
            let iat: i64 = parts[3].parse().map_err(|_| AuthError::InvalidToken)?;
            let exp: i64 = parts[4].parse().map_err(|_| AuthError::InvalidToken)?;
            Ok(TokenClaims {
                user_id,
                session_id,
                issued_at: chrono::DateTime::from_timestamp_micros(iat)
                    .ok_or(AuthError::InvalidToken)?,
                expires_at: chrono::DateTime::from_timestamp_micros(exp)
                    .ok_or(AuthError::InvalidToken)?,
            })
        }
    }

    struct Harness {
        authority: SessionAuthority,
        sessions: Arc<MemorySessionStore>,
        accounts: Arc<MemoryAccountStore>,
    }

    fn harness_for(user_id: DbId) -> Harness {
        harness_with_policy(user_id, AuthPolicy::default())
    }

    fn harness_with_policy(user_id: DbId, policy: AuthPolicy) -> Harness {
        let sessions = Arc::new(MemorySessionStore::default());
        let accounts = Arc::new(MemoryAccountStore::with_active(user_id));
        let authority = SessionAuthority::new(
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::clone(&accounts) as Arc<dyn AccountStore>,
            Arc::new(PlainHasher),
            Arc::new(FakeSigner),
            policy,
        );
        Harness {
            authority,
            sessions,
            accounts,
        }
    }

    // -----------------------------------------------------------------------
    // Issue
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_issue_creates_live_session() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.expect("issue should succeed");

        assert!(issued.session.issued_at < issued.session.expires_at);
        assert_eq!(issued.session.user_id, 1);
        assert!(issued.session.revoked_at.is_none());
        assert!(issued.session.deleted_at.is_none());
        assert!(issued.access_expires_at < issued.expires_at);

        // The stored hash must match the returned refresh token, and the raw
        // token must never be what is stored.
        let stored = h.sessions.get(issued.session.session_id).unwrap();
        assert_eq!(stored.refresh_token_hash, format!("h:{}", issued.refresh_token));
        assert_ne!(stored.refresh_token_hash, issued.refresh_token);
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_refresh_rotates_session_id() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        let refreshed = h
            .authority
            .refresh(&issued.refresh_token)
            .await
            .expect("refresh should succeed");

        assert_ne!(refreshed.session.session_id, issued.session.session_id);
        assert_eq!(refreshed.session.user_id, 1);
        assert!(refreshed.session.issued_at < refreshed.session.expires_at);

        // The retired id must no longer resolve.
        assert!(h.sessions.get(issued.session.session_id).is_none());
    }

    #[tokio::test]
    async fn test_storage_id_survives_rotation() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        let refreshed = h.authority.refresh(&issued.refresh_token).await.unwrap();
        assert_eq!(refreshed.session.id, issued.session.id);

        // The lineage stays reachable by storage id under its new session_id.
        let found = h
            .sessions
            .find_by_id(issued.session.id)
            .await
            .unwrap()
            .expect("lineage should still resolve by storage id");
        assert_eq!(found.session_id, refreshed.session.session_id);

        assert!(h.sessions.find_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replayed_refresh_token_fails_second_time() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        h.authority.refresh(&issued.refresh_token).await.unwrap();

        // Same token again: the old session id was retired by rotation.
        let result = h.authority.refresh(&issued.refresh_token).await;
        assert_matches!(result, Err(AuthError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_single_winner() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        let (a, b) = tokio::join!(
            h.authority.refresh(&issued.refresh_token),
            h.authority.refresh(&issued.refresh_token),
        );

        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one concurrent refresh may succeed");

        let loser = if a.is_err() { a } else { b };
        assert_matches!(
            loser,
            Err(AuthError::SessionNotFound) | Err(AuthError::TokenMismatch)
        );
    }

    #[tokio::test]
    async fn test_malformed_token_never_reaches_store() {
        let h = harness_for(1);

        let result = h.authority.refresh("not-a-token").await;
        assert_matches!(result, Err(AuthError::InvalidToken));
        assert_eq!(h.sessions.lookup_count(), 0, "no store lookup may happen");
    }

    #[tokio::test]
    async fn test_refresh_unknown_session_id() {
        let h = harness_for(1);
        // Well-formed token whose session id was never issued.
        let stray = FakeSigner
            .sign(&TokenClaims {
                user_id: 1,
                session_id: Uuid::new_v4(),
                issued_at: Utc::now(),
                expires_at: Utc::now() + Duration::days(7),
            })
            .unwrap();

        let result = h.authority.refresh(&stray).await;
        assert_matches!(result, Err(AuthError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_refresh_with_wrong_secret_is_mismatch() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        // Valid shape, correct session id, but different secret material:
        // a stolen-lineage token presented against the stored hash.
        let forged = FakeSigner
            .sign(&TokenClaims {
                user_id: 1,
                session_id: issued.session.session_id,
                issued_at: Utc::now() + Duration::seconds(1),
                expires_at: Utc::now() + Duration::days(7),
            })
            .unwrap();
        assert_ne!(forged, issued.refresh_token);

        let result = h.authority.refresh(&forged).await;
        assert_matches!(result, Err(AuthError::TokenMismatch));
    }

    #[tokio::test]
    async fn test_refresh_expired_session() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        // Age the stored session past its window instead of sleeping.
        let mut stale = issued.session.clone();
        stale.expires_at = Utc::now() - Duration::seconds(1);
        h.sessions.put(stale);

        let result = h.authority.refresh(&issued.refresh_token).await;
        assert_matches!(result, Err(AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_short_ttl_session_expires_in_real_time() {
        let h = harness_with_policy(
            1,
            AuthPolicy {
                access_ttl: Duration::milliseconds(20),
                refresh_ttl: Duration::milliseconds(40),
            },
        );
        let issued = h.authority.issue(1).await.unwrap();
        assert!(issued.session.issued_at < issued.session.expires_at);

        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        let result = h.authority.refresh(&issued.refresh_token).await;
        assert_matches!(result, Err(AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_refresh_soft_deleted_session() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        let mut deleted = issued.session.clone();
        deleted.deleted_at = Some(Utc::now());
        h.sessions.put(deleted);

        let result = h.authority.refresh(&issued.refresh_token).await;
        assert_matches!(result, Err(AuthError::SessionDeleted));
    }

    #[tokio::test]
    async fn test_refresh_suspended_account() {
        let h = harness_for(7);
        let issued = h.authority.issue(7).await.unwrap();

        h.accounts.put(Account {
            id: 7,
            status: AccountStatus::Suspended,
            deleted_at: None,
        });

        let result = h.authority.refresh(&issued.refresh_token).await;
        assert_matches!(result, Err(AuthError::AccountNotEligible));

        // The failed attempt must not have rotated anything.
        assert!(h.sessions.get(issued.session.session_id).is_some());
    }

    #[tokio::test]
    async fn test_refresh_vanished_account() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        h.accounts.accounts.lock().unwrap().clear();

        let result = h.authority.refresh(&issued.refresh_token).await;
        assert_matches!(result, Err(AuthError::AccountNotEligible));
    }

    // -----------------------------------------------------------------------
    // Revoke
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_revoke_blocks_refresh_permanently() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        h.authority
            .revoke(issued.session.session_id)
            .await
            .expect("revoke should succeed");

        let result = h.authority.refresh(&issued.refresh_token).await;
        assert_matches!(result, Err(AuthError::SessionRevoked));

        // Still revoked on a later attempt; the marker is never cleared.
        let result = h.authority.refresh(&issued.refresh_token).await;
        assert_matches!(result, Err(AuthError::SessionRevoked));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let h = harness_for(1);
        let issued = h.authority.issue(1).await.unwrap();

        h.authority.revoke(issued.session.session_id).await.unwrap();
        let second = h.authority.revoke(issued.session.session_id).await;
        assert!(second.is_ok(), "double revoke is a no-op, not an error");
    }

    #[tokio::test]
    async fn test_revoke_all_ends_every_lineage() {
        let h = harness_for(1);
        let first = h.authority.issue(1).await.unwrap();
        let second = h.authority.issue(1).await.unwrap();

        let revoked = h.authority.revoke_all(1).await.unwrap();
        assert_eq!(revoked, 2);

        let result = h.authority.refresh(&first.refresh_token).await;
        assert_matches!(result, Err(AuthError::SessionRevoked));
        let result = h.authority.refresh(&second.refresh_token).await;
        assert_matches!(result, Err(AuthError::SessionRevoked));

        // Nothing live remains, so a second sweep is a zero-count success.
        assert_eq!(h.authority.revoke_all(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_revoke_unknown_session() {
        let h = harness_for(1);
        let result = h.authority.revoke(Uuid::new_v4()).await;
        assert_matches!(result, Err(AuthError::SessionNotFound));
    }
}
