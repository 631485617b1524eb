//! In-memory backend for development and tests.
//!
//! Implements the same traits as the Postgres backend so the API wiring can
//! swap them without touching handlers.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use doorman_auth::{CredentialStore, Principal, RevocationStore, Role, StoreError, UserId};

use crate::record::{NewUser, UserPatch, UserRecord, UserStats};
use crate::user_store::{ListQuery, Page, UserStore, UserStoreError};

#[derive(Debug, Default)]
struct UsersInner {
    next_id: i64,
    // BTreeMap keeps ids ordered; ids are issued monotonically, so reverse
    // iteration is newest-first.
    rows: BTreeMap<i64, UserRecord>,
}

/// In-memory user table with serial ids.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<UsersInner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(record: &UserRecord, query: &ListQuery) -> bool {
        if let Some(role) = query.role {
            if record.role != role {
                return false;
            }
        }
        if let Some(search) = &query.search {
            let needle = search.to_lowercase();
            if !record.name.to_lowercase().contains(&needle)
                && !record.email.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<UserRecord, UserStoreError> {
        let mut inner = self.inner.write().unwrap();
        let email = user.email.to_lowercase();
        if inner.rows.values().any(|r| r.email == email) {
            return Err(UserStoreError::DuplicateEmail);
        }

        inner.next_id += 1;
        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(inner.next_id),
            name: user.name,
            email,
            password_hash: user.password_hash,
            role: user.role,
            active: true,
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(record.id.as_i64(), record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, UserStoreError> {
        Ok(self.inner.read().unwrap().rows.get(&id.as_i64()).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError> {
        let email = email.to_lowercase();
        Ok(self
            .inner
            .read()
            .unwrap()
            .rows
            .values()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page, UserStoreError> {
        let inner = self.inner.read().unwrap();
        let matching: Vec<&UserRecord> = inner
            .rows
            .values()
            .rev()
            .filter(|r| Self::matches(r, query))
            .collect();

        let total = matching.len() as u64;
        let users = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(Page {
            users,
            total,
            page: query.page.max(1),
            limit: query.limit,
        })
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> Result<UserRecord, UserStoreError> {
        let mut inner = self.inner.write().unwrap();

        if let Some(email) = &patch.email {
            let email = email.to_lowercase();
            if inner
                .rows
                .values()
                .any(|r| r.email == email && r.id != id)
            {
                return Err(UserStoreError::DuplicateEmail);
            }
        }

        let record = inner
            .rows
            .get_mut(&id.as_i64())
            .ok_or(UserStoreError::NotFound)?;

        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(email) = patch.email {
            record.email = email.to_lowercase();
        }
        if let Some(hash) = patch.password_hash {
            record.password_hash = hash;
        }
        if let Some(role) = patch.role {
            record.role = role;
        }
        if let Some(active) = patch.active {
            record.active = active;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<UserRecord, UserStoreError> {
        self.update(
            id,
            UserPatch {
                active: Some(active),
                ..Default::default()
            },
        )
        .await
    }

    async fn delete(&self, id: UserId) -> Result<(), UserStoreError> {
        let mut inner = self.inner.write().unwrap();
        inner
            .rows
            .remove(&id.as_i64())
            .map(|_| ())
            .ok_or(UserStoreError::NotFound)
    }

    async fn stats(&self) -> Result<UserStats, UserStoreError> {
        let inner = self.inner.read().unwrap();
        let cutoff = Utc::now() - Duration::days(30);

        let total_users = inner.rows.len() as u64;
        let admins = inner.rows.values().filter(|r| r.role == Role::Admin).count() as u64;
        let recent_registrations = inner
            .rows
            .values()
            .filter(|r| r.created_at >= cutoff)
            .count() as u64;
        let recent_users = inner.rows.values().rev().take(5).cloned().collect();

        Ok(UserStats {
            total_users,
            admins,
            users: total_users - admins,
            recent_registrations,
            recent_users,
        })
    }
}

#[async_trait]
impl CredentialStore for InMemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Principal>, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .rows
            .get(&id.as_i64())
            .map(UserRecord::principal))
    }

    async fn find_active_by_id(&self, id: UserId) -> Result<Option<Principal>, StoreError> {
        Ok(CredentialStore::find_by_id(self, id)
            .await?
            .filter(|p| p.active))
    }
}

/// In-memory revocation set, keyed by jti.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn contains(&self, jti: Uuid) -> Result<bool, StoreError> {
        Ok(self.entries.read().unwrap().contains_key(&jti))
    }

    async fn upsert(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap();
        let slot = entries.entry(jti).or_insert(expires_at);
        if expires_at > *slot {
            *slot = expires_at;
        }
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, exp| *exp > now);
        Ok((before - entries.len()) as u64)
    }
}
