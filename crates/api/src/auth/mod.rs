//! Authentication and authorization primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- HS256 token signing/verification behind the core's
//!   `TokenSigner` seam.
//! - [`hasher`] -- SHA-256 refresh-secret hashing behind `SecretHasher`.

pub mod hasher;
pub mod jwt;
pub mod password;
