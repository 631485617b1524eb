use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use doorman_auth::{GuardError, TokenError};
use doorman_store::UserStoreError;

pub fn token_error_to_response(err: TokenError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        TokenError::Malformed | TokenError::BadSignature => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_token", message)
        }
        TokenError::Expired => json_error(StatusCode::UNAUTHORIZED, "token_expired", message),
        TokenError::Revoked => json_error(StatusCode::UNAUTHORIZED, "token_revoked", message),
        TokenError::PrincipalNotFound | TokenError::PrincipalInactive => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
        }
        TokenError::StoreUnavailable(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", message)
        }
        TokenError::Signing(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "signing_error", message)
        }
    }
}

pub fn guard_error_to_response(err: GuardError) -> axum::response::Response {
    match err {
        GuardError::Forbidden(reason) => json_error(StatusCode::FORBIDDEN, "forbidden", reason),
    }
}

pub fn user_store_error_to_response(err: UserStoreError) -> axum::response::Response {
    match err {
        UserStoreError::DuplicateEmail => {
            json_error(StatusCode::CONFLICT, "email_exists", "email already exists")
        }
        UserStoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        UserStoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn validation_error(errors: Vec<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": "validation failed",
            "details": errors,
        })),
    )
        .into_response()
}
