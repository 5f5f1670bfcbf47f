//! SHA-256 hashing of refresh-token secret material.
//!
//! Only the hex digest of a refresh token is persisted, so a database leak
//! does not compromise active sessions. The token string itself is already
//! high-entropy (a signed JWT over a random session id), so a keyed or
//! salted construction is not required here; Argon2id remains reserved for
//! passwords.

use agora_core::auth::{AuthError, SecretHasher};
use sha2::{Digest, Sha256};

/// [`SecretHasher`] backed by SHA-256 hex digests.
pub struct Sha256SecretHasher;

impl Sha256SecretHasher {
    fn digest(secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl SecretHasher for Sha256SecretHasher {
    fn hash(&self, secret: &str) -> Result<String, AuthError> {
        Ok(Self::digest(secret))
    }

    fn verify(&self, secret: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(Self::digest(secret) == hash)
    }
}
