//! Catalog and order domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use petal_core::{OrderId, OrderStatus, Price, ProductId, UserId};

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    /// Path of the product photo relative to the media root.
    pub image: String,
}

/// Parameters for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub image: String,
}

/// A customer order.
///
/// `total_price` is always the sum of the current prices of the order's
/// products; it is recomputed whenever an order is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// Owning user.
    #[serde(rename = "user")]
    pub user_id: UserId,
    /// Distinct products, each counted once.
    pub products: Vec<Product>,
    pub status: OrderStatus,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
    pub delivery_address: Option<String>,
    pub total_price: Price,
}

impl Order {
    /// Build an order, computing its total from `products`.
    #[must_use]
    pub fn new(
        id: OrderId,
        user_id: UserId,
        products: Vec<Product>,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        delivery_address: Option<String>,
    ) -> Self {
        let total_price = products.iter().map(|p| p.price).sum();
        Self {
            id,
            user_id,
            products,
            status,
            created_at,
            delivery_address,
            total_price,
        }
    }

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

/// Parameters for inserting an order.
///
/// The service validates `product_ids` (non-empty, distinct, existing) before
/// the store sees them.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub product_ids: Vec<ProductId>,
    pub delivery_address: Option<String>,
}
