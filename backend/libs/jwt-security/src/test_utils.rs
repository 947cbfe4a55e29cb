//! Test helpers for code that needs real credentials
//!
//! Enabled for this crate's own tests and, via the `test-utils` feature, for
//! dependents' dev-dependencies.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use crate::{Claims, JwtManager, RevocationGuard};

/// Re-exported so dependents can build durations without a direct chrono dependency
pub use chrono::Duration as ChronoDuration;

/// 64 high-entropy characters; classifies as `SecretStrength::Strong`
pub const TEST_SECRET: &str = "y9K$mP2vRx#TnZ@s4Yw!cGf7Dh&e3Xa6Wq8Lj5BtNu1Zp0MkYhVgCxFbAsSdQwEr";

pub fn test_manager() -> JwtManager {
    JwtManager::new(TEST_SECRET, Duration::hours(1)).expect("test secret is strong")
}

pub fn test_guard() -> RevocationGuard {
    RevocationGuard::new(test_manager())
}

/// Sign arbitrary claims, bypassing `JwtManager` (for expired or forged tokens)
pub fn encode_with_secret(secret: &str, claims: &Claims) -> String {
    encode(
        &Header::new(jsonwebtoken::Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("encoding test claims")
}

/// A correctly signed token that expired `ago` in the past
pub fn expired_token(user_id: Uuid, ago: Duration) -> String {
    let exp = Utc::now() - ago;
    encode_with_secret(
        TEST_SECRET,
        &Claims {
            sub: user_id.to_string(),
            iat: (exp - Duration::hours(1)).timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        },
    )
}
