//! Client side of the REST gateway.
//!
//! The dispatcher talks to the gateway only through [`GatewayApi`], so tests
//! can substitute an in-process implementation for the HTTP one.

mod client;
mod error;
pub mod types;

use async_trait::async_trait;

use petal_core::{OrderId, OrderStatus, ProductId, TelegramId, UserId};

pub use client::HttpGateway;
pub use error::GatewayError;
pub use types::{Identity, Order, Product, Report, StatusChange, User};

/// Operations the bot performs against the gateway.
///
/// Calls taking a `token` act as that user; the gateway applies its role
/// checks to them.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Identity linked to a chat account, `None` if unregistered.
    async fn identity(&self, telegram_id: TelegramId) -> Result<Option<Identity>, GatewayError>;

    /// Register a customer for a chat account.
    async fn register(
        &self,
        telegram_id: TelegramId,
        name: &str,
        phone: &str,
    ) -> Result<Identity, GatewayError>;

    /// Link a chat account to an existing user.
    async fn link(&self, telegram_id: TelegramId, user_id: UserId)
    -> Result<Identity, GatewayError>;

    /// The catalog.
    async fn products(&self) -> Result<Vec<Product>, GatewayError>;

    /// Orders visible to the user, newest first.
    async fn orders(&self, token: &str) -> Result<Vec<Order>, GatewayError>;

    /// One order.
    async fn order(&self, token: &str, id: OrderId) -> Result<Order, GatewayError>;

    /// Move an order to `status`.
    async fn update_status(
        &self,
        token: &str,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<StatusChange, GatewayError>;

    /// Place an order. Without an address the saved one is used.
    async fn create_order(
        &self,
        token: &str,
        product_ids: &[ProductId],
        delivery_address: Option<&str>,
    ) -> Result<Order, GatewayError>;

    /// Saved delivery address.
    async fn address(&self, token: &str) -> Result<Option<String>, GatewayError>;

    /// Replace the saved delivery address.
    async fn save_address(&self, token: &str, address: &str)
    -> Result<Option<String>, GatewayError>;

    /// Latest sales report, `None` when there were no orders.
    async fn latest_report(&self, token: &str) -> Result<Option<Report>, GatewayError>;
}
