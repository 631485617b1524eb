//! Store contracts consumed by the Token Service.
//!
//! Both stores are injected; the Token Service holds no state of its own.
//! Any number of process instances sharing one revocation store see one
//! consistent revocation view.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{Principal, UserId};

/// Store I/O failure, distinct from "not found".
///
/// A transient outage must fail differently from a missing principal, since
/// the two imply different client remediation (retry vs. re-authenticate).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("store unavailable: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Lookup side of the user table, as the Token Service sees it.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolve a principal by id, regardless of its active flag.
    async fn find_by_id(&self, id: UserId) -> Result<Option<Principal>, StoreError>;

    /// Resolve a principal by id, excluding deactivated records.
    async fn find_active_by_id(&self, id: UserId) -> Result<Option<Principal>, StoreError>;
}

/// Revocation record store keyed by token `jti`.
///
/// An entry is meaningful only until its `expires_at` passes; after that the
/// token fails the expiry check on its own and the row is garbage.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn contains(&self, jti: Uuid) -> Result<bool, StoreError>;

    /// Insert or refresh a revocation entry. Idempotent; when the same jti is
    /// upserted twice the later `expires_at` wins.
    async fn upsert(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Delete entries whose `expires_at` is at or before `now`; returns the
    /// number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
