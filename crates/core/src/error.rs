//! Domain errors raised while establishing an identity (registration and
//! login input checks). The session lifecycle has its own closed taxonomy
//! in [`crate::auth::AuthError`]; these cover everything before a session
//! exists.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input rejected by a domain rule, e.g. the password strength policy.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The presented credentials did not establish an identity. The message
    /// is deliberately the same for unknown user and wrong password.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Identity established, but the account is not allowed to act
    /// (suspended or soft-deleted).
    #[error("Forbidden: {0}")]
    Forbidden(String),
}
