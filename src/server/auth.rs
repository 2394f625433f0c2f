//! Bearer token middleware and the register/login endpoints.

use super::error::ApiError;
use super::{AppState, blocking, json_body};
use crate::auth::{self, LoginRequest, RegisterRequest};
use crate::error::AuthError;
use axum::{
    Json,
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use serde_json::{Value, json};
use tracing::debug;

/// Username the request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

/// Extract the token from an `Authorization` header value.
fn bearer_token(value: &str) -> Result<&str, AuthError> {
    match value.split(' ').collect::<Vec<_>>().as_slice() {
        ["Bearer", token] => Ok(*token),
        _ => Err(AuthError::Unauthorized("invalid authorization header")),
    }
}

/// Resolve `Authorization: Bearer <token>` to a [`Caller`] or reject with 401.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        debug!(uri = %request.uri(), "No authorization given");
        return Err(AuthError::Unauthorized("no authorization given").into());
    };
    let value = value
        .to_str()
        .map_err(|_| AuthError::Unauthorized("invalid authorization header"))?;
    let token = bearer_token(value)?;

    let Some(username) = state.tokens.username_for(token) else {
        return Err(AuthError::Unauthorized("invalid token").into());
    };

    debug!(%username, uri = %request.uri(), "Authenticated request");
    request.extensions_mut().insert(Caller(username));
    Ok(next.run(request).await)
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: RegisterRequest = json_body(&headers, &body)?;
    let db = state.db.clone();
    let username = blocking(move || auth::register(&db, request)).await?;
    Ok(Json(json!({
        "message": format!("register {} successful", username)
    })))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: LoginRequest = json_body(&headers, &body)?;
    let db = state.db.clone();
    let tokens = state.tokens.clone();
    let token = blocking(move || auth::login(&db, &tokens, request)).await?;
    Ok(Json(json!({
        "message": "Logged in successful",
        "token": token,
    })))
}
