//! HS256 JWT signing and verification.
//!
//! Both access and refresh tokens are signed JWTs carrying the owning user
//! id (`sub`), the session id (`sid`), and the standard `iat`/`exp`/`iss`
//! claims. [`JwtSigner`] implements the core's `TokenSigner` seam for
//! refresh tokens and additionally validates access tokens for request
//! authentication.

use agora_core::auth::{AuthError, TokenClaims, TokenSigner};
use chrono::DateTime;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire-format claims as they appear inside the JWT payload.
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    /// Subject -- the account's internal database id.
    sub: i64,
    /// Session id bound to this token's lineage.
    sid: Uuid,
    /// Issued-at time (UTC Unix timestamp).
    iat: i64,
    /// Expiration time (UTC Unix timestamp).
    exp: i64,
    /// Issuer.
    iss: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Issuer claim stamped into every token and required on verification.
    pub issuer: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;
/// Default issuer claim.
const DEFAULT_ISSUER: &str = "agora";

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ISSUER`               | no       | `agora` |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string());

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            issuer,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }
}

/// Signs and verifies tokens with a single HS256 key pair.
pub struct JwtSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
}

impl JwtSigner {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
        }
    }

    /// Validate an access token for request authentication: signature,
    /// issuer, and expiry (with the library's default leeway).
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        claims_from_wire(data.claims)
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        let payload = JwtClaims {
            sub: claims.user_id,
            sid: claims.session_id,
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
            iss: self.issuer.clone(),
        };
        encode(&Header::default(), &payload, &self.encoding).map_err(AuthError::infrastructure)
    }

    /// Verify signature and issuer only. Expiry is deliberately not checked
    /// here: for refresh tokens the session record is authoritative, so the
    /// authority reports `SessionExpired` instead of a generic decode error.
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        claims_from_wire(data.claims)
    }
}

/// Convert wire claims back into the core's claim type. Timestamps are
/// second-precision through the JWT.
fn claims_from_wire(raw: JwtClaims) -> Result<TokenClaims, AuthError> {
    Ok(TokenClaims {
        user_id: raw.sub,
        session_id: raw.sid,
        issued_at: DateTime::from_timestamp(raw.iat, 0).ok_or(AuthError::InvalidToken)?,
        expires_at: DateTime::from_timestamp(raw.exp, 0).ok_or(AuthError::InvalidToken)?,
    })
}
