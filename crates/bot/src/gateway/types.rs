//! JSON shapes returned by the gateway.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use petal_core::{OrderId, OrderStatus, Price, ProductId, ReportFigures, Role, UserId};

/// A shop account as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub role: Role,
}

impl User {
    /// Name to greet the user with.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// A user plus the token the bot acts with on their behalf.
#[derive(Clone, Deserialize)]
pub struct Identity {
    pub user: User,
    pub token: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
}

/// An order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "user")]
    pub user_id: UserId,
    pub products: Vec<Product>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub delivery_address: Option<String>,
    pub total_price: Price,
}

impl Order {
    /// Comma-separated product names.
    #[must_use]
    pub fn product_names(&self) -> String {
        self.products
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of a status update.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    /// `false` when the order already had the requested status.
    pub changed: bool,
    pub order: Order,
}

/// A sales report snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Report {
    pub date: NaiveDate,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    #[serde(flatten)]
    pub figures: ReportFigures,
}

/// Gateway error body.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(super) struct RegisterRequest<'a> {
    pub telegram_id: i64,
    pub name: &'a str,
    pub phone: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct LinkRequest {
    pub telegram_id: i64,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateOrderRequest<'a> {
    pub product_ids: &'a [ProductId],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(super) struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct AddressBody {
    pub delivery_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReportEnvelope {
    pub report: Option<Report>,
}
