use async_trait::async_trait;
use thiserror::Error;

use doorman_auth::{Role, UserId};

use crate::record::{NewUser, UserPatch, UserRecord, UserStats};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserStoreError {
    /// Another record already owns the email.
    #[error("email already exists")]
    DuplicateEmail,

    #[error("user not found")]
    NotFound,

    /// Backend I/O failure; retryable, unlike the variants above.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// List filter for the admin user index.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: u32,
    /// Page size; callers clamp this to 100.
    pub limit: u32,
    /// Case-insensitive substring match over name and email.
    pub search: Option<String>,
    pub role: Option<Role>,
}

impl ListQuery {
    pub fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.limit as u64
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub users: Vec<UserRecord>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit as u64)
        }
    }
}

/// Full CRUD contract over the user table, consumed by the request handlers.
///
/// The Token Service sees only the narrower `CredentialStore` slice of this;
/// both backends implement the two traits over the same data.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<UserRecord, UserStoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, UserStoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError>;

    async fn list(&self, query: &ListQuery) -> Result<Page, UserStoreError>;

    /// Apply a partial update; returns the updated record.
    async fn update(&self, id: UserId, patch: UserPatch) -> Result<UserRecord, UserStoreError>;

    /// Soft delete / reactivate.
    async fn set_active(&self, id: UserId, active: bool) -> Result<UserRecord, UserStoreError>;

    /// Hard delete.
    async fn delete(&self, id: UserId) -> Result<(), UserStoreError>;

    async fn stats(&self) -> Result<UserStats, UserStoreError>;
}
