//! Logout revocation for session credentials
//!
//! A revoked credential stays in the [`RevocationSet`] only while it could
//! still pass signature and expiry checks. Once `exp + leeway` has passed,
//! [`JwtManager::decode`] rejects it on its own, so the entry is dropped.
//! Memory is therefore bounded by the number of logouts within one token
//! lifetime rather than growing for the life of the process.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{Claims, IssuedToken, JwtManager, TokenError, VALIDATION_LEEWAY_SECS};

/// Concurrent set of revoked credentials keyed by the exact token string
#[derive(Debug, Default)]
pub struct RevocationSet {
    // token -> embedded `exp`
    entries: DashMap<String, i64>,
}

impl RevocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the token was not already present
    pub fn insert(&self, token: &str, expires_at: i64) -> bool {
        match self.entries.entry(token.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(expires_at);
                true
            }
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Drop entries whose token can no longer validate at `now` (Unix secs)
    pub fn purge_expired(&self, now: i64) -> usize {
        let leeway = VALIDATION_LEEWAY_SECS as i64;
        let mut evicted = 0;
        self.entries.retain(|_, expires_at| {
            let keep = now <= *expires_at + leeway;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a logout call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationOutcome {
    /// Added to the set; held until `expires_at` (plus leeway)
    Revoked { expires_at: i64 },
    /// Already in the set; nothing changed
    AlreadyRevoked,
    /// Forged, malformed or expired: it cannot authorize anything, so it is
    /// not stored
    AlreadyUnusable(TokenError),
}

/// Gatekeeper for every protected operation
pub struct RevocationGuard {
    jwt: JwtManager,
    revoked: RevocationSet,
}

impl RevocationGuard {
    pub fn new(jwt: JwtManager) -> Self {
        Self {
            jwt,
            revoked: RevocationSet::new(),
        }
    }

    pub fn issue(&self, user_id: uuid::Uuid) -> Result<IssuedToken, TokenError> {
        self.jwt.issue(user_id)
    }

    /// Full check: signature, expiry, and revocation.
    pub fn authorize(&self, token: &str) -> Result<Claims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Missing);
        }
        if self.revoked.contains(token) {
            return Err(TokenError::Revoked);
        }
        self.jwt.decode(token)
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.authorize(token).is_ok()
    }

    /// Revoke a credential. Idempotent.
    pub fn revoke(&self, token: &str) -> Result<RevocationOutcome, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Missing);
        }

        let claims = match self.jwt.decode(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "logout with unusable token; nothing to revoke");
                return Ok(RevocationOutcome::AlreadyUnusable(err));
            }
        };

        if self.revoked.insert(token, claims.exp) {
            info!(jti = %claims.jti, expires_at = claims.exp, "token revoked");
            Ok(RevocationOutcome::Revoked {
                expires_at: claims.exp,
            })
        } else {
            Ok(RevocationOutcome::AlreadyRevoked)
        }
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now().timestamp())
    }

    /// Evict revocations whose token can no longer validate at `now`
    pub fn purge_expired_at(&self, now: i64) -> usize {
        self.revoked.purge_expired(now)
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    /// Periodically evict expired entries. Stops once the guard is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let guard: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(guard) = guard.upgrade() else {
                    break;
                };
                let evicted = guard.purge_expired();
                if evicted > 0 {
                    debug!(
                        evicted,
                        remaining = guard.revoked_count(),
                        "evicted expired revocations"
                    );
                }
            }
        })
    }
}
