use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use doorman_auth::TokenService;

use crate::app::errors;
use crate::context::{PrincipalContext, TokenContext};

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())?;

    let principal = state
        .tokens
        .verify(token)
        .await
        .map_err(errors::token_error_to_response)?;

    let token = TokenContext::new(token);
    req.extensions_mut().insert(PrincipalContext::new(principal));
    req.extensions_mut().insert(token);

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Response> {
    let missing = || {
        errors::json_error(
            StatusCode::UNAUTHORIZED,
            "missing_token",
            "authorization header with a bearer token is required",
        )
    };

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(missing)?;

    let header = header.to_str().map_err(|_| missing())?;

    let header = header.strip_prefix("Bearer ").ok_or_else(missing)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token)
}
