//! `doorman-store` — credential, user, and revocation storage.
//!
//! Two interchangeable backends behind the same traits: Postgres (sqlx) for
//! deployments and an in-memory store for development and tests.

pub mod memory;
pub mod password;
pub mod postgres;
pub mod record;
pub mod user_store;

pub use memory::{InMemoryRevocationStore, InMemoryUserStore};
pub use password::{hash_password, verify_password, DEFAULT_BCRYPT_COST};
pub use postgres::{PgRevocationStore, PgUserStore, ensure_schema};
pub use record::{NewUser, UserPatch, UserRecord, UserStats};
pub use user_store::{ListQuery, Page, UserStore, UserStoreError};
