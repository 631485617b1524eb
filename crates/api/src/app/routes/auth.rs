//! Registration, login, logout, profile, and password change.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use doorman_auth::Role;
use doorman_store::{hash_password, verify_password, NewUser, UserPatch};

use crate::app::dto::{
    self, ChangePasswordRequest, LoginRequest, RegisterRequest, UserResponse,
};
use crate::app::{errors, services::AppServices};
use crate::context::{PrincipalContext, TokenContext};

/// Authenticated /auth endpoints; register and login live on the public router.
pub fn router() -> Router {
    Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/password", put(change_password))
}

/// POST /auth/register - Create an account and issue a first token.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterRequest>,
) -> axum::response::Response {
    let mut field_errors = Vec::new();
    dto::validate_name(&body.name, &mut field_errors);
    dto::validate_email(&body.email, &mut field_errors);
    dto::validate_password(&body.password, &mut field_errors);
    if !field_errors.is_empty() {
        return errors::validation_error(field_errors);
    }

    let password_hash = match hash_password(&body.password, services.bcrypt_cost) {
        Ok(hash) => hash,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                e.to_string(),
            );
        }
    };

    // Self-registration always creates an ordinary user.
    let user = match services
        .users
        .create(NewUser {
            name: body.name.trim().to_string(),
            email: body.email,
            password_hash,
            role: Role::User,
        })
        .await
    {
        Ok(user) => user,
        Err(e) => return errors::user_store_error_to_response(e),
    };

    let token = match services.tokens.issue(user.id) {
        Ok(token) => token,
        Err(e) => return errors::token_error_to_response(e),
    };

    tracing::info!(user_id = %user.id, "user registered");

    (
        StatusCode::CREATED,
        Json(json!({
            "user": UserResponse::from(&user),
            "token": token,
        })),
    )
        .into_response()
}

/// POST /auth/login - Exchange credentials for a token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    // One response for unknown email and wrong password; no account probing.
    let invalid = || {
        errors::json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid email or password",
        )
    };

    let user = match services.users.find_by_email(&body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return invalid(),
        Err(e) => return errors::user_store_error_to_response(e),
    };

    match verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return invalid(),
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                e.to_string(),
            );
        }
    }

    if !user.active {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "account_deactivated",
            "account is deactivated",
        );
    }

    let token = match services.tokens.issue(user.id) {
        Ok(token) => token,
        Err(e) => return errors::token_error_to_response(e),
    };

    tracing::info!(user_id = %user.id, "user logged in");

    (
        StatusCode::OK,
        Json(json!({
            "user": UserResponse::from(&user),
            "token": token,
            "expires_in": services.tokens.ttl().num_seconds(),
        })),
    )
        .into_response()
}

/// POST /auth/logout - Revoke the presented token.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<TokenContext>,
) -> axum::response::Response {
    match services.tokens.revoke(token.raw()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "logged out" })),
        )
            .into_response(),
        Err(e) => errors::token_error_to_response(e),
    }
}

/// GET /auth/profile - The authenticated user's own record.
pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.users.find_by_id(principal.principal().id).await {
        Ok(Some(user)) => (
            StatusCode::OK,
            Json(json!({ "user": UserResponse::from(&user) })),
        )
            .into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// PUT /auth/password - Change the authenticated user's password.
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ChangePasswordRequest>,
) -> axum::response::Response {
    let mut field_errors = Vec::new();
    dto::validate_password(&body.new_password, &mut field_errors);
    if !field_errors.is_empty() {
        return errors::validation_error(field_errors);
    }

    let user = match services.users.find_by_id(principal.principal().id).await {
        Ok(Some(user)) => user,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => return errors::user_store_error_to_response(e),
    };

    match verify_password(&body.current_password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_password",
                "current password is incorrect",
            );
        }
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                e.to_string(),
            );
        }
    }

    let password_hash = match hash_password(&body.new_password, services.bcrypt_cost) {
        Ok(hash) => hash,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                e.to_string(),
            );
        }
    };

    let patch = UserPatch {
        password_hash: Some(password_hash),
        ..UserPatch::default()
    };
    match services.users.update(user.id, patch).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "password updated" })),
        )
            .into_response(),
        Err(e) => errors::user_store_error_to_response(e),
    }
}
