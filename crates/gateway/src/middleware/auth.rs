//! Authentication extractors.
//!
//! Clients authenticate with `Authorization: Bearer <token>`; the
//! `Token <token>` scheme is accepted too. User tokens resolve to a
//! [`User`]; the bot authenticates its identity lookups with the shared bot
//! API key instead.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn my_orders(RequireUser(user): RequireUser) -> impl IntoResponse {
//!     format!("Hello, {}!", user.name())
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;
use tracing::Span;

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// Extractor that requires a valid user token.
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = state.users().authenticate(token).await?;

        Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(&user.id, &user.username);

        Ok(Self(user))
    }
}

/// Extractor that requires the bot API key.
pub struct RequireBot;

impl FromRequestParts<AppState> for RequireBot {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        if !constant_time_compare(token, state.config().bot_api_key.expose_secret()) {
            return Err(AppError::Unauthorized("invalid bot key".to_string()));
        }
        Ok(Self)
    }
}

/// Pull the credential out of the `Authorization` header.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing credentials".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("Token "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("malformed authorization header".to_string()))?;

    Ok(token)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
