use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;

/// Claims carried inside a signed token (transport-agnostic).
///
/// This is the full payload the Token Service signs: the subject, the
/// issuance window, and the per-issuance `jti` used as the revocation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user this token authenticates.
    pub sub: UserId,

    /// Unique per issuance; the revocation key.
    pub jti: Uuid,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp. Strictly after `issued_at`.
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    /// Build claims for a fresh issuance: new v7 jti, `expires_at = now + ttl`.
    pub fn issue(sub: UserId, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            sub,
            jti: Uuid::now_v7(),
            issued_at: now,
            expires_at: now + ttl,
        }
    }
}

/// Outcome of the deterministic claim-window check.
///
/// Signature verification / decoding is intentionally outside this function;
/// it validates the claims only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    /// `expires_at <= issued_at`: the token could never have been valid.
    InvalidWindow,
    /// `now` is at or past `expires_at`.
    Expired,
}

/// Validate the time window of already-decoded claims against `now`.
pub fn validate_window(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), WindowError> {
    if claims.expires_at <= claims.issued_at {
        return Err(WindowError::InvalidWindow);
    }
    if now >= claims.expires_at {
        return Err(WindowError::Expired);
    }
    Ok(())
}
