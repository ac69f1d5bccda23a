//! Chat identity handlers, authorized by the bot API key.
//!
//! The bot resolves each chat account to a user token here and then calls
//! the other endpoints as that user, so role checks apply to chat users the
//! same way they apply to any other client.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

use petal_core::{TelegramId, UserId};

use super::json_body;
use crate::error::{AppError, Result};
use crate::middleware::RequireBot;
use crate::models::Identity;
use crate::state::AppState;

/// Body of `POST /api/bot/identities/`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub telegram_id: TelegramId,
    pub name: String,
    pub phone: String,
}

/// Body of `POST /api/bot/identities/link/`.
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub telegram_id: TelegramId,
    pub user_id: UserId,
}

/// Identity of a registered chat account.
///
/// # Route
///
/// `GET /api/bot/identities/{telegram_id}/`
pub async fn identity(
    State(state): State<AppState>,
    _bot: RequireBot,
    Path(telegram_id): Path<String>,
) -> Result<Json<Identity>> {
    let telegram_id: TelegramId = telegram_id
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid telegram id: {telegram_id}")))?;
    Ok(Json(state.users().identity_for_telegram(telegram_id).await?))
}

/// Register a customer from the chat registration flow.
///
/// # Route
///
/// `POST /api/bot/identities/`
pub async fn register(
    State(state): State<AppState>,
    _bot: RequireBot,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Identity>)> {
    let request = json_body(payload)?;
    let identity = state
        .users()
        .register_telegram(request.telegram_id, &request.name, &request.phone)
        .await?;
    Ok((StatusCode::CREATED, Json(identity)))
}

/// Link a chat account to an existing customer account; `403` for staff
/// and admin accounts.
///
/// # Route
///
/// `POST /api/bot/identities/link/`
pub async fn link(
    State(state): State<AppState>,
    _bot: RequireBot,
    payload: std::result::Result<Json<LinkRequest>, JsonRejection>,
) -> Result<Json<Identity>> {
    let request = json_body(payload)?;
    Ok(Json(
        state
            .users()
            .link_telegram(request.telegram_id, request.user_id)
            .await?,
    ))
}
