//! Catalog route handlers.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::models::Product;
use crate::state::AppState;

/// List all products.
///
/// # Route
///
/// `GET /api/products/`
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.store().list_products().await?))
}
