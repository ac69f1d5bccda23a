//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use petal_core::{OrderId, ProductId, Transition};

use super::json_body;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::Order;
use crate::state::AppState;

/// Body of `POST /api/orders/`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub product_ids: Vec<ProductId>,
    #[serde(default)]
    pub delivery_address: Option<String>,
}

/// Body of `POST /api/orders/{id}/update/`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Response of a status update.
#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub status: &'static str,
    /// `false` when the order already had the requested status.
    pub changed: bool,
    pub order: Order,
}

fn order_id(raw: &str) -> Result<OrderId> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid order id: {raw}")))
}

/// List orders visible to the caller, newest first.
///
/// # Route
///
/// `GET /api/orders/`
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list(&user).await?))
}

/// Place an order for the caller.
///
/// # Route
///
/// `POST /api/orders/`
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let request = json_body(payload)?;
    let order = state
        .orders()
        .create(&user, request.product_ids, request.delivery_address)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Show one order.
///
/// # Route
///
/// `GET /api/orders/{id}/`
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id = order_id(&id)?;
    Ok(Json(state.orders().get(&user, id).await?))
}

/// Change an order's status.
///
/// # Route
///
/// `POST /api/orders/{id}/update/`
pub async fn update_status(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<UpdateStatusResponse>> {
    let id = order_id(&id)?;
    let request = json_body(payload)?;
    let update = state
        .orders()
        .update_status(&user, id, &request.status)
        .await?;

    Ok(Json(UpdateStatusResponse {
        status: "ok",
        changed: update.transition == Transition::Applied,
        order: update.order,
    }))
}
