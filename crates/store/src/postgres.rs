//! Postgres backend (sqlx).
//!
//! Every statement is parameterized. Role/active filters and partial updates
//! are assembled with `QueryBuilder`, never by string interpolation of user
//! input.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use doorman_auth::{CredentialStore, Principal, RevocationStore, Role, StoreError, UserId};

use crate::record::{NewUser, UserPatch, UserRecord, UserStats};
use crate::user_store::{ListQuery, Page, UserStore, UserStoreError};

/// Create tables and indexes if they do not exist yet.
///
/// Intended for startup; deployments with managed migrations can skip it.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(100) UNIQUE NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            role VARCHAR(20) NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
            active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS revoked_tokens (
            jti UUID PRIMARY KEY,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users (email)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_revoked_tokens_expires ON revoked_tokens (expires_at)",
    )
    .execute(pool)
    .await?;

    tracing::info!("database schema ensured");
    Ok(())
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, active, created_at, updated_at";

fn row_to_user(row: &PgRow) -> Result<UserRecord, UserStoreError> {
    let role: String = row.try_get("role").map_err(unavailable)?;
    let role = role
        .parse::<Role>()
        .map_err(|e| UserStoreError::Unavailable(e.to_string()))?;

    Ok(UserRecord {
        id: UserId::new(row.try_get("id").map_err(unavailable)?),
        name: row.try_get("name").map_err(unavailable)?,
        email: row.try_get("email").map_err(unavailable)?,
        password_hash: row.try_get("password_hash").map_err(unavailable)?,
        role,
        active: row.try_get("active").map_err(unavailable)?,
        created_at: row.try_get("created_at").map_err(unavailable)?,
        updated_at: row.try_get("updated_at").map_err(unavailable)?,
    })
}

fn unavailable(err: sqlx::Error) -> UserStoreError {
    UserStoreError::Unavailable(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}

/// `users` table access.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<UserRecord, UserStoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (name, email, password_hash, role) \
             VALUES ($1, lower($2), $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                UserStoreError::DuplicateEmail
            } else {
                unavailable(e)
            }
        })?;

        row_to_user(&row)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, UserStoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn list(&self, query: &ListQuery) -> Result<Page, UserStoreError> {
        fn push_filters<'a>(builder: &mut QueryBuilder<'a, sqlx::Postgres>, query: &'a ListQuery) {
            let mut prefix = " WHERE ";
            if let Some(search) = &query.search {
                builder
                    .push(prefix)
                    .push("(name ILIKE ")
                    .push_bind(format!("%{search}%"))
                    .push(" OR email ILIKE ")
                    .push_bind(format!("%{search}%"))
                    .push(")");
                prefix = " AND ";
            }
            if let Some(role) = query.role {
                builder.push(prefix).push("role = ").push_bind(role.as_str());
            }
        }

        let mut count = QueryBuilder::new("SELECT COUNT(*) AS total FROM users");
        push_filters(&mut count, query);
        let total: i64 = count
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?
            .try_get("total")
            .map_err(unavailable)?;

        let mut select = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(query.limit as i64)
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        let users = rows
            .iter()
            .map(row_to_user)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            users,
            total: total as u64,
            page: query.page.max(1),
            limit: query.limit,
        })
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> Result<UserRecord, UserStoreError> {
        if patch.is_empty() {
            return UserStore::find_by_id(self, id)
                .await?
                .ok_or(UserStoreError::NotFound);
        }

        let mut builder = QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");
        if let Some(name) = &patch.name {
            fields.push("name = ").push_bind_unseparated(name);
        }
        if let Some(email) = &patch.email {
            fields
                .push("email = lower(")
                .push_bind_unseparated(email)
                .push_unseparated(")");
        }
        if let Some(hash) = &patch.password_hash {
            fields.push("password_hash = ").push_bind_unseparated(hash);
        }
        if let Some(role) = patch.role {
            fields.push("role = ").push_bind_unseparated(role.as_str());
        }
        if let Some(active) = patch.active {
            fields.push("active = ").push_bind_unseparated(active);
        }
        fields.push("updated_at = now()");

        builder
            .push(" WHERE id = ")
            .push_bind(id.as_i64())
            .push(&format!(" RETURNING {USER_COLUMNS}"));

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    UserStoreError::DuplicateEmail
                } else {
                    unavailable(e)
                }
            })?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(UserStoreError::NotFound),
        }
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
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(UserStoreError::NotFound);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<UserStats, UserStoreError> {
        let totals = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE role = 'admin') AS admins,
                COUNT(*) FILTER (WHERE created_at >= now() - INTERVAL '30 days') AS recent
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        let total: i64 = totals.try_get("total").map_err(unavailable)?;
        let admins: i64 = totals.try_get("admins").map_err(unavailable)?;
        let recent: i64 = totals.try_get("recent").map_err(unavailable)?;

        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT 5"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;
        let recent_users = rows
            .iter()
            .map(row_to_user)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UserStats {
            total_users: total as u64,
            admins: admins as u64,
            users: (total - admins) as u64,
            recent_registrations: recent as u64,
            recent_users,
        })
    }
}

#[async_trait]
impl CredentialStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Principal>, StoreError> {
        let row = sqlx::query("SELECT id, role, active FROM users WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::new(e.to_string()))?;

        row.map(|row| -> Result<Principal, StoreError> {
            let role: String = row.try_get("role").map_err(|e| StoreError::new(e.to_string()))?;
            Ok(Principal::new(
                UserId::new(row.try_get("id").map_err(|e| StoreError::new(e.to_string()))?),
                role.parse().map_err(|_| StoreError::new("unknown role in users table"))?,
                row.try_get("active").map_err(|e| StoreError::new(e.to_string()))?,
            ))
        })
        .transpose()
    }

    async fn find_active_by_id(&self, id: UserId) -> Result<Option<Principal>, StoreError> {
        Ok(CredentialStore::find_by_id(self, id)
            .await?
            .filter(|p| p.active))
    }
}

/// `revoked_tokens` table access.
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn contains(&self, jti: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS one FROM revoked_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::new(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn upsert(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2)
            ON CONFLICT (jti)
            DO UPDATE SET expires_at = GREATEST(revoked_tokens.expires_at, EXCLUDED.expires_at)
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::new(e.to_string()))?;
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::new(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
