//! Request/response DTOs and field validation.

use serde::{Deserialize, Serialize};

use doorman_auth::Role;
use doorman_store::{Page, UserRecord};

// ─────────────────────────────────────────────────────────────────────────────
// Request DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListUsersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<Role>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Response DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// A user as returned over HTTP. Deliberately has no password hash field.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.as_i64(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            active: user.active,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

pub fn page_to_json(page: &Page) -> serde_json::Value {
    let users: Vec<UserResponse> = page.users.iter().map(UserResponse::from).collect();
    let total_pages = page.total_pages();
    serde_json::json!({
        "users": users,
        "pagination": {
            "current_page": page.page,
            "total_pages": total_pages,
            "total_users": page.total,
            "limit": page.limit,
            "has_next": (page.page as u64) < total_pages,
            "has_prev": page.page > 1,
        },
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Field validation
// ─────────────────────────────────────────────────────────────────────────────

pub fn validate_name(name: &str, errors: &mut Vec<String>) {
    let len = name.trim().chars().count();
    if !(2..=50).contains(&len) {
        errors.push("name must be between 2 and 50 characters".to_string());
    }
}

pub fn validate_email(email: &str, errors: &mut Vec<String>) {
    // Shape check only (something@something.tld); uniqueness is the store's job.
    let mut parts = email.split('@');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None)
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
    );
    if !valid {
        errors.push("email address is invalid".to_string());
    }
}

pub fn validate_password(password: &str, errors: &mut Vec<String>) {
    if password.chars().count() < 6 {
        errors.push("password must be at least 6 characters".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase())
        || !password.chars().any(|c| c.is_ascii_lowercase())
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        errors.push(
            "password must contain at least one uppercase letter, one lowercase letter, and one number"
                .to_string(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_for(f: impl FnOnce(&mut Vec<String>)) -> Vec<String> {
        let mut errors = Vec::new();
        f(&mut errors);
        errors
    }

    #[test]
    fn accepts_reasonable_fields() {
        assert!(errors_for(|e| validate_name("Jane Doe", e)).is_empty());
        assert!(errors_for(|e| validate_email("jane@example.com", e)).is_empty());
        assert!(errors_for(|e| validate_password("Secret1pass", e)).is_empty());
    }

    #[test]
    fn rejects_short_name_and_bad_email() {
        assert!(!errors_for(|e| validate_name("j", e)).is_empty());
        assert!(!errors_for(|e| validate_email("not-an-email", e)).is_empty());
        assert!(!errors_for(|e| validate_email("a@b", e)).is_empty());
    }

    #[test]
    fn rejects_weak_passwords() {
        // Too short, and missing character classes.
        assert!(!errors_for(|e| validate_password("Ab1", e)).is_empty());
        assert!(!errors_for(|e| validate_password("alllowercase1", e)).is_empty());
        assert!(!errors_for(|e| validate_password("ALLUPPERCASE1", e)).is_empty());
        assert!(!errors_for(|e| validate_password("NoDigitsHere", e)).is_empty());
    }
}
