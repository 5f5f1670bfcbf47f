//! Authentication session lifecycle.
//!
//! - [`session`] -- the session record, liveness rules, and rotation DTOs.
//! - [`store`] -- collaborator traits (session store, account store, secret
//!   hasher, token signer) injected into the authority.
//! - [`authority`] -- [`authority::SessionAuthority`], which owns issuance,
//!   refresh-with-rotation, and revocation of token pairs.
//! - [`error`] -- the closed [`error::AuthError`] taxonomy.

pub mod authority;
pub mod error;
pub mod session;
pub mod store;

pub use authority::{AuthPolicy, IssuedTokens, SessionAuthority};
pub use error::AuthError;
pub use session::{Account, AccountStatus, NewSession, Session, SessionRotation};
pub use store::{AccountStore, RevokeOutcome, SecretHasher, SessionStore, TokenClaims, TokenSigner};
