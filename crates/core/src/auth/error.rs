//! Error taxonomy for the session lifecycle.
//!
//! Every business-rule failure is a distinct variant so callers can
//! discriminate programmatically. Only [`AuthError::Infrastructure`] is
//! retryable; all other variants require the client to re-authenticate.

/// Failure kinds surfaced by [`crate::auth::SessionAuthority`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed, unsigned, or signature-invalid token.
    #[error("token is malformed or its signature is invalid")]
    InvalidToken,

    /// The session id embedded in a token resolves to no session record,
    /// e.g. after rotation retired it or it never existed.
    #[error("no session matches the presented token")]
    SessionNotFound,

    /// Signature valid but the secret does not match the stored hash
    /// (replay of a retired token, or tampering).
    #[error("token secret does not match the stored hash")]
    TokenMismatch,

    /// The session was explicitly revoked.
    #[error("session has been revoked")]
    SessionRevoked,

    /// The session was soft-deleted.
    #[error("session has been deleted")]
    SessionDeleted,

    /// The refresh validity window has passed.
    #[error("session has expired")]
    SessionExpired,

    /// The owning account is deleted or not active.
    #[error("account is not eligible for a session")]
    AccountNotEligible,

    /// Store, hasher, or signer failure. Propagated unchanged; safe to
    /// retry with backoff at the caller's discretion.
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl AuthError {
    /// Wrap any collaborator failure as an infrastructure error.
    pub fn infrastructure<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AuthError::Infrastructure(anyhow::Error::new(err))
    }

    /// Whether the caller may retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Infrastructure(_))
    }
}
