//! JWT session credentials for Nova Pulse
//!
//! **Features**:
//! - HS256 signing with a strength-checked shared secret
//! - JWT ID (jti) on every token so two logins never share a credential
//! - [`RevocationGuard`]: logout revocation with expiry-bounded memory
//!
//! Every protected operation goes through [`RevocationGuard::authorize`];
//! nothing outside this crate decodes tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

pub mod revocation;
pub mod secret_validation;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use revocation::{RevocationGuard, RevocationOutcome, RevocationSet};
pub use secret_validation::{validate_secret_strength, SecretStrength};

/// Clock skew tolerated on `exp`/`nbf`. Revoked entries are kept this much
/// longer than their expiry.
pub const VALIDATION_LEEWAY_SECS: u64 = 30;
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("no token provided")]
    Missing,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token is invalid (logged out)")]
    Revoked,
    #[error("JWT secret is too weak")]
    WeakSecret,
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// JWT claims carried by a session credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| TokenError::Malformed("subject is not a user id".into()))
    }
}

/// A freshly signed credential
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Signs and verifies session credentials
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtManager {
    /// Build a manager from the shared secret.
    ///
    /// Weak secrets are rejected outright; acceptable-but-short ones only warn.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        match validate_secret_strength(secret) {
            SecretStrength::Weak => return Err(TokenError::WeakSecret),
            SecretStrength::Acceptable => {
                warn!("JWT secret is acceptable but shorter than recommended")
            }
            SecretStrength::Strong => {}
        }

        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.leeway = VALIDATION_LEEWAY_SECS;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify signature and expiry. Does not consult any revocation state.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Missing);
        }
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}
