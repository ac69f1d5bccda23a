//! Order store: persistence for users, products, orders and reports.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL`, the production backend
//! - [`MemoryStore`] - process-local maps, used by tests and the
//!   `GATEWAY_STORAGE=memory` development mode
//!
//! ## Tables
//!
//! - `users` - Accounts with role, phone, Telegram link and saved address
//! - `api_tokens` - One bearer token per user
//! - `products` - Catalog
//! - `orders` / `order_products` - Orders and their distinct products
//! - `reports` - Sales report snapshots
//!
//! # Migrations
//!
//! Migrations are stored in `crates/gateway/migrations/` and run via:
//! ```bash
//! cargo run -p petal-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use petal_core::{OrderId, OrderStatus, ProductId, TelegramId, UserId};

use crate::models::{NewOrder, NewProduct, NewReport, NewUser, Order, Product, Report, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique phone number) or a lost
    /// compare-and-set race.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage operations used by the services.
///
/// Implementations only persist and load; permission checks, status rules
/// and input validation live in [`crate::services`].
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // --- users -------------------------------------------------------------

    /// Create a user. Fails with `Conflict` on a duplicate username, phone
    /// number or Telegram ID.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Get a user by ID.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get the user linked to a Telegram account.
    async fn find_user_by_telegram(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<User>, RepositoryError>;

    /// All users, ordered by ID.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Link a Telegram account to a user.
    ///
    /// Fails with `NotFound` for an unknown user and `Conflict` when the
    /// Telegram ID belongs to someone else or the user is linked to a
    /// different Telegram account.
    async fn link_telegram(
        &self,
        id: UserId,
        telegram_id: TelegramId,
    ) -> Result<User, RepositoryError>;

    /// Replace a user's saved delivery address.
    async fn set_delivery_address(
        &self,
        id: UserId,
        address: &str,
    ) -> Result<User, RepositoryError>;

    // --- tokens ------------------------------------------------------------

    /// Store `key` as the user's token unless one already exists, returning
    /// the token that is in effect afterwards.
    async fn issue_token(&self, user_id: UserId, key: &str) -> Result<String, RepositoryError>;

    /// Resolve a bearer token.
    async fn find_user_by_token(&self, key: &str) -> Result<Option<User>, RepositoryError>;

    /// Users that have never been issued a token, ordered by ID.
    async fn list_users_without_token(&self) -> Result<Vec<User>, RepositoryError>;

    // --- products ----------------------------------------------------------

    /// All products, ordered by ID.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Products with the given IDs; unknown IDs are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Create a product.
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    // --- orders ------------------------------------------------------------

    /// Insert an order with status `pending` and a server timestamp.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Get an order by ID.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders, newest first; only those of `owner` when given.
    async fn list_orders(&self, owner: Option<UserId>) -> Result<Vec<Order>, RepositoryError>;

    /// Move an order from `from` to `to`.
    ///
    /// The write only happens if the stored status still equals `from`;
    /// otherwise the call fails with `Conflict` and nothing changes.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError>;

    /// Orders created in `[start, end)`, oldest first.
    async fn orders_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError>;

    // --- reports -----------------------------------------------------------

    /// Persist a report snapshot.
    async fn insert_report(&self, report: NewReport) -> Result<Report, RepositoryError>;

    /// The most recently created snapshot.
    async fn latest_report(&self) -> Result<Option<Report>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
