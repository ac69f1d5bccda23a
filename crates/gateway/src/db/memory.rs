//! In-process implementation of [`OrderStore`].
//!
//! Mirrors the `PostgreSQL` constraints (unique username, phone, Telegram ID
//! and token owner; compare-and-set status updates) so services behave the
//! same against either backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use petal_core::{OrderId, OrderStatus, ProductId, ReportId, TelegramId, UserId};

use super::{OrderStore, RepositoryError};
use crate::models::{NewOrder, NewProduct, NewReport, NewUser, Order, Product, Report, User};

#[derive(Debug, Clone)]
struct OrderRecord {
    id: OrderId,
    user_id: UserId,
    product_ids: Vec<ProductId>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    delivery_address: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    tokens: BTreeMap<String, UserId>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, OrderRecord>,
    reports: Vec<Report>,
    next_id: i32,
}

impl Tables {
    const fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn materialize(&self, record: &OrderRecord) -> Order {
        let products = record
            .product_ids
            .iter()
            .filter_map(|id| self.products.get(id).cloned())
            .collect();
        Order::new(
            record.id,
            record.user_id,
            products,
            record.status,
            record.created_at,
            record.delivery_address.clone(),
        )
    }

    fn check_unique(&self, user: &NewUser) -> Result<(), RepositoryError> {
        for existing in self.users.values() {
            if existing.username == user.username {
                return Err(RepositoryError::Conflict("users_username_key".to_owned()));
            }
            if user.phone_number.is_some() && existing.phone_number == user.phone_number {
                return Err(RepositoryError::Conflict("users_phone_number_key".to_owned()));
            }
            if user.telegram_id.is_some() && existing.telegram_id == user.telegram_id {
                return Err(RepositoryError::Conflict("users_telegram_id_key".to_owned()));
            }
        }
        Ok(())
    }
}

/// Order store backed by in-memory maps.
///
/// IDs come from a single shared sequence, so an ID is never reused across
/// tables. Data is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an order with an explicit creation time.
    ///
    /// Used to backdate orders when exercising report windows.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the owner or a product does not exist.
    pub async fn insert_order_at(
        &self,
        order: NewOrder,
        created_at: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&order.user_id) {
            return Err(RepositoryError::Conflict("orders_user_id_fkey".to_owned()));
        }
        if order
            .product_ids
            .iter()
            .any(|id| !tables.products.contains_key(id))
        {
            return Err(RepositoryError::Conflict(
                "order_products_product_id_fkey".to_owned(),
            ));
        }

        let mut product_ids = order.product_ids;
        product_ids.sort_unstable();
        product_ids.dedup();

        let id = OrderId::new(tables.next_id());
        let record = OrderRecord {
            id,
            user_id: order.user_id,
            product_ids,
            status: OrderStatus::Pending,
            created_at,
            delivery_address: order.delivery_address,
        };
        let created = tables.materialize(&record);
        tables.orders.insert(id, record);
        Ok(created)
    }

    /// Change a product's price in place.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown product.
    pub async fn set_product_price(
        &self,
        id: ProductId,
        price: petal_core::Price,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        product.price = price;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(&user)?;

        let id = UserId::new(tables.next_id());
        let created = User {
            id,
            username: user.username,
            display_name: user.display_name,
            phone_number: user.phone_number,
            telegram_id: user.telegram_id,
            delivery_address: None,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_telegram(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.telegram_id == Some(telegram_id))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn link_telegram(
        &self,
        id: UserId,
        telegram_id: TelegramId,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .values()
            .any(|u| u.id != id && u.telegram_id == Some(telegram_id))
        {
            return Err(RepositoryError::Conflict("users_telegram_id_key".to_owned()));
        }

        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        match user.telegram_id {
            Some(existing) if existing != telegram_id => Err(RepositoryError::Conflict(
                "user is linked to another telegram account".to_owned(),
            )),
            _ => {
                user.telegram_id = Some(telegram_id);
                Ok(user.clone())
            }
        }
    }

    async fn set_delivery_address(
        &self,
        id: UserId,
        address: &str,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.delivery_address = Some(address.to_owned());
        Ok(user.clone())
    }

    async fn issue_token(&self, user_id: UserId, key: &str) -> Result<String, RepositoryError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(RepositoryError::Conflict("api_tokens_user_id_fkey".to_owned()));
        }
        if let Some((existing, _)) = tables.tokens.iter().find(|(_, owner)| **owner == user_id) {
            return Ok(existing.clone());
        }
        if tables.tokens.contains_key(key) {
            return Err(RepositoryError::Conflict("api_tokens_pkey".to_owned()));
        }

        tables.tokens.insert(key.to_owned(), user_id);
        Ok(key.to_owned())
    }

    async fn find_user_by_token(&self, key: &str) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tokens
            .get(key)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn list_users_without_token(&self) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| !tables.tokens.values().any(|owner| *owner == u.id))
            .cloned()
            .collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = ProductId::new(tables.next_id());
        let created = Product {
            id,
            name: product.name,
            price: product.price,
            image: product.image,
        };
        tables.products.insert(id, created.clone());
        Ok(created)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.insert_order_at(order, Utc::now()).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).map(|r| tables.materialize(r)))
    }

    async fn list_orders(&self, owner: Option<UserId>) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut records: Vec<&OrderRecord> = tables
            .orders
            .values()
            .filter(|r| owner.is_none_or(|owner| r.user_id == owner))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records.into_iter().map(|r| tables.materialize(r)).collect())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let record = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.status != from {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is no longer {from}"
            )));
        }
        record.status = to;
        let record = record.clone();
        Ok(tables.materialize(&record))
    }

    async fn orders_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut records: Vec<&OrderRecord> = tables
            .orders
            .values()
            .filter(|r| r.created_at >= start && r.created_at < end)
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records.into_iter().map(|r| tables.materialize(r)).collect())
    }

    async fn insert_report(&self, report: NewReport) -> Result<Report, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = ReportId::new(tables.next_id());
        let created = Report {
            id,
            date: report.date,
            window_start: report.window_start,
            window_end: report.window_end,
            figures: report.figures,
            created_at: Utc::now(),
        };
        tables.reports.push(created.clone());
        Ok(created)
    }

    async fn latest_report(&self) -> Result<Option<Report>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reports
            .iter()
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }
}
