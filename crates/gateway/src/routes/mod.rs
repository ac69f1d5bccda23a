//! HTTP route handlers for the gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Store reachable
//!
//! # Catalog (public)
//! GET  /api/products/                   - Product list
//!
//! # Orders (user token)
//! GET  /api/orders/                     - Role-scoped order list
//! POST /api/orders/                     - Place an order
//! GET  /api/orders/{id}/                - Order detail (owner or staff)
//! POST /api/orders/{id}/update/         - Change status (staff)
//!
//! # Profile (user token)
//! GET  /api/user/address/               - Saved delivery address
//! POST /api/user/address/save/          - Replace saved address
//!
//! # Reports (staff token)
//! GET  /api/reports/latest/             - Cached or fresh snapshot
//! POST /api/reports/                    - Snapshot for an explicit window
//! GET  /api/reports/sales.csv           - Last 30 days as CSV
//!
//! # Chat identities (bot key)
//! GET  /api/bot/identities/{telegram_id}/ - Identity for a chat account
//! POST /api/bot/identities/             - Register from chat
//! POST /api/bot/identities/link/        - Link chat to an existing user
//! ```

pub mod bot;
pub mod health;
pub mod orders;
pub mod products;
pub mod reports;
pub mod users;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Unwrap a JSON body, turning extractor rejections into `400` errors.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders/", get(orders::index).post(orders::create))
        .route("/api/orders/{id}/", get(orders::show))
        .route("/api/orders/{id}/update/", post(orders::update_status))
}

/// Create the report routes router.
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports/", post(reports::generate))
        .route("/api/reports/latest/", get(reports::latest))
        .route("/api/reports/sales.csv", get(reports::sales_csv))
}

/// Create the bot identity routes router.
pub fn bot_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bot/identities/", post(bot::register))
        .route("/api/bot/identities/link/", post(bot::link))
        .route("/api/bot/identities/{telegram_id}/", get(bot::identity))
}

/// Create all routes for the gateway.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/api/products/", get(products::index))
        .route("/api/user/address/", get(users::address))
        .route("/api/user/address/save/", post(users::save_address))
        .merge(order_routes())
        .merge(report_routes())
        .merge(bot_routes())
}
