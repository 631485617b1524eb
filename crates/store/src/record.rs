use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use doorman_auth::{Principal, Role, UserId};

/// A row of the `users` table.
///
/// `password_hash` never leaves the store layer in API responses; DTO
/// mapping strips it at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// The authorization view of this record.
    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.role, self.active)
    }
}

/// Fields required to insert a user. The id and timestamps are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update. `None` leaves a column untouched.
///
/// Role and active-flag changes are admin-only; the handler layer enforces
/// that before the patch reaches the store.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
            && self.active.is_none()
    }
}

/// Aggregates for the admin stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total_users: u64,
    pub admins: u64,
    pub users: u64,
    /// Registrations in the last 30 days.
    pub recent_registrations: u64,
    /// The five most recent records, newest first.
    pub recent_users: Vec<UserRecord>,
}
