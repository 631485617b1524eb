//! Admin and ownership-guarded user management.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use doorman_auth::{authorize, Policy, UserId};
use doorman_store::{hash_password, ListQuery, UserPatch};

use crate::app::dto::{self, ListUsersQuery, UpdateUserRequest, UserResponse};
use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/stats", get(stats))
        .route(
            "/:id",
            get(get_user).put(update_user).delete(soft_delete_user),
        )
        .route("/:id/hard", delete(hard_delete_user))
        .route("/:id/activate", post(activate_user))
}

/// GET /users - Paged user index (admin only).
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ListUsersQuery>,
) -> axum::response::Response {
    if let Err(e) = authorize(&principal.principal(), None, &Policy::admin()) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let query = ListQuery {
        page: query.page.unwrap_or(1).max(1),
        limit: query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE),
        search: query.search.filter(|s| !s.trim().is_empty()),
        role: query.role,
    };

    match services.users.list(&query).await {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(&page))).into_response(),
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// GET /users/stats - Aggregate counts plus the latest registrations (admin only).
pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize(&principal.principal(), None, &Policy::admin()) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.users.stats().await {
        Ok(stats) => {
            let recent: Vec<UserResponse> =
                stats.recent_users.iter().map(UserResponse::from).collect();
            (
                StatusCode::OK,
                Json(json!({
                    "total_users": stats.total_users,
                    "admins": stats.admins,
                    "users": stats.users,
                    "recent_registrations": stats.recent_registrations,
                    "recent_users": recent,
                })),
            )
                .into_response()
        }
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// GET /users/:id - A single user; owners see themselves, admins see anyone.
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let id = UserId::new(id);
    if let Err(e) = authorize(&principal.principal(), Some(id), &Policy::ownership()) {
        return errors::guard_error_to_response(e);
    }

    match services.users.find_by_id(id).await {
        Ok(Some(user)) => (
            StatusCode::OK,
            Json(json!({ "user": UserResponse::from(&user) })),
        )
            .into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// PUT /users/:id - Partial update; role and active changes are admin only.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> axum::response::Response {
    let id = UserId::new(id);
    let actor = principal.principal();
    if let Err(e) = authorize(&actor, Some(id), &Policy::ownership()) {
        return errors::guard_error_to_response(e);
    }

    // Owners may edit their profile, but only admins may touch role or the
    // active flag (self-promotion would bypass the guard entirely).
    if (body.role.is_some() || body.active.is_some()) && !actor.role.is_admin() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "only admins can change role or active status",
        );
    }

    let mut field_errors = Vec::new();
    if let Some(name) = &body.name {
        dto::validate_name(name, &mut field_errors);
    }
    if let Some(email) = &body.email {
        dto::validate_email(email, &mut field_errors);
    }
    if let Some(password) = &body.password {
        dto::validate_password(password, &mut field_errors);
    }
    if !field_errors.is_empty() {
        return errors::validation_error(field_errors);
    }

    let password_hash = match &body.password {
        Some(password) => match hash_password(password, services.bcrypt_cost) {
            Ok(hash) => Some(hash),
            Err(e) => {
                return errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "hash_error",
                    e.to_string(),
                );
            }
        },
        None => None,
    };

    let patch = UserPatch {
        name: body.name.map(|n| n.trim().to_string()),
        email: body.email,
        password_hash,
        role: body.role,
        active: body.active,
    };
    if patch.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "empty_update", "no fields to update");
    }

    match services.users.update(id, patch).await {
        Ok(user) => (
            StatusCode::OK,
            Json(json!({ "user": UserResponse::from(&user) })),
        )
            .into_response(),
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// DELETE /users/:id - Soft delete: deactivate the account (admin only).
pub async fn soft_delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let id = UserId::new(id);
    let actor = principal.principal();
    if let Err(e) = authorize(&actor, None, &Policy::admin()) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }
    if actor.id == id {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "self_delete",
            "cannot delete your own account",
        );
    }

    match services.users.set_active(id, false).await {
        Ok(_) => {
            tracing::info!(user_id = %id, "user deactivated");
            (
                StatusCode::OK,
                Json(json!({ "message": "user deactivated" })),
            )
                .into_response()
        }
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// DELETE /users/:id/hard - Remove the record entirely (admin only).
pub async fn hard_delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let id = UserId::new(id);
    let actor = principal.principal();
    if let Err(e) = authorize(&actor, None, &Policy::admin()) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }
    if actor.id == id {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "self_delete",
            "cannot delete your own account",
        );
    }

    match services.users.delete(id).await {
        Ok(()) => {
            tracing::info!(user_id = %id, "user deleted");
            (StatusCode::OK, Json(json!({ "message": "user deleted" }))).into_response()
        }
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// POST /users/:id/activate - Reverse a soft delete (admin only).
pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let id = UserId::new(id);
    if let Err(e) = authorize(&principal.principal(), None, &Policy::admin()) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.users.set_active(id, true).await {
        Ok(user) => (
            StatusCode::OK,
            Json(json!({ "user": UserResponse::from(&user) })),
        )
            .into_response(),
        Err(e) => errors::user_store_error_to_response(e),
    }
}
