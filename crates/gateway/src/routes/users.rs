//! Saved delivery address handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use super::json_body;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Saved address payload, used for both request and response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddressBody {
    pub delivery_address: Option<String>,
}

/// The caller's saved delivery address.
///
/// # Route
///
/// `GET /api/user/address/`
pub async fn address(RequireUser(user): RequireUser) -> Json<AddressBody> {
    Json(AddressBody {
        delivery_address: user.delivery_address,
    })
}

/// Replace the caller's saved delivery address.
///
/// # Route
///
/// `POST /api/user/address/save/`
pub async fn save_address(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: std::result::Result<Json<AddressBody>, JsonRejection>,
) -> Result<Json<AddressBody>> {
    let address = json_body(payload)?.delivery_address.unwrap_or_default();
    let user = state.users().save_address(&user, &address).await?;
    Ok(Json(AddressBody {
        delivery_address: user.delivery_address,
    }))
}
