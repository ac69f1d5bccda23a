//! `PostgreSQL` implementation of [`OrderStore`].
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate
//! builds without a live database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use petal_core::{
    OrderId, OrderStatus, Price, ProductId, ReportFigures, ReportId, Role, StatusFigures,
    TelegramId, UserId,
};

use super::{OrderStore, RepositoryError};
use crate::models::{NewOrder, NewProduct, NewReport, NewUser, Order, Product, Report, User};

const USER_COLUMNS: &str =
    "id, username, display_name, phone_number, telegram_id, delivery_address, role, created_at";

const ORDER_COLUMNS: &str = "id, user_id, status, created_at, delivery_address";

const REPORT_COLUMNS: &str = "id, date, window_start, window_end, total_orders, total_revenue, \
     pending_orders, pending_revenue, processing_orders, processing_revenue, \
     delivering_orders, delivering_revenue, completed_orders, completed_revenue, \
     canceled_orders, canceled_revenue, created_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    display_name: Option<String>,
    phone_number: Option<String>,
    telegram_id: Option<TelegramId>,
    delivery_address: Option<String>,
    role: Role,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            phone_number: row.phone_number,
            telegram_id: row.telegram_id,
            delivery_address: row.delivery_address,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Price,
    image: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            image: row.image,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    delivery_address: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderProductRow {
    order_id: OrderId,
    id: ProductId,
    name: String,
    price: Price,
    image: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: ReportId,
    date: NaiveDate,
    window_start: NaiveDate,
    window_end: NaiveDate,
    total_orders: i32,
    total_revenue: Price,
    pending_orders: i32,
    pending_revenue: Price,
    processing_orders: i32,
    processing_revenue: Price,
    delivering_orders: i32,
    delivering_revenue: Price,
    completed_orders: i32,
    completed_revenue: Price,
    canceled_orders: i32,
    canceled_revenue: Price,
    created_at: DateTime<Utc>,
}

fn count_from_db(value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative order count: {value}")))
}

fn count_to_db(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("order count overflow: {value}")))
}

fn figures(orders: i32, revenue: Price) -> Result<StatusFigures, RepositoryError> {
    Ok(StatusFigures {
        orders: count_from_db(orders)?,
        revenue,
    })
}

impl TryFrom<ReportRow> for Report {
    type Error = RepositoryError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            date: row.date,
            window_start: row.window_start,
            window_end: row.window_end,
            figures: ReportFigures {
                total_orders: count_from_db(row.total_orders)?,
                total_revenue: row.total_revenue,
                pending: figures(row.pending_orders, row.pending_revenue)?,
                processing: figures(row.processing_orders, row.processing_revenue)?,
                delivering: figures(row.delivering_orders, row.delivering_revenue)?,
                completed: figures(row.completed_orders, row.completed_revenue)?,
                canceled: figures(row.canceled_orders, row.canceled_revenue)?,
            },
            created_at: row.created_at,
        })
    }
}

/// Map unique and foreign-key violations to `Conflict`.
fn map_write_error(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        let constraint = db_err.constraint().unwrap_or("unknown constraint");
        return RepositoryError::Conflict(format!("{what}: {constraint}"));
    }
    RepositoryError::Database(e)
}

/// `PostgreSQL`-backed order store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Load products for a batch of order rows and assemble orders.
    async fn attach_products(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let product_rows = sqlx::query_as::<_, OrderProductRow>(
            r"
            SELECT op.order_id, p.id, p.name, p.price, p.image
            FROM order_products op
            JOIN products p ON p.id = op.product_id
            WHERE op.order_id = ANY($1)
            ORDER BY p.id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<Product>> = HashMap::new();
        for row in product_rows {
            by_order.entry(row.order_id).or_default().push(Product {
                id: row.id,
                name: row.name,
                price: row.price,
                image: row.image,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let products = by_order.remove(&row.id).unwrap_or_default();
                Order::new(
                    row.id,
                    row.user_id,
                    products,
                    row.status,
                    row.created_at,
                    row.delivery_address,
                )
            })
            .collect())
    }

    async fn attach_one(&self, row: OrderRow) -> Result<Order, RepositoryError> {
        self.attach_products(vec![row])
            .await?
            .pop()
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (username, display_name, phone_number, telegram_id, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.phone_number)
        .bind(user.telegram_id)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "user already exists"))?;

        Ok(row.into())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.fetch_user(id).await
    }

    async fn find_user_by_telegram(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1"
        ))
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn link_telegram(
        &self,
        id: UserId,
        telegram_id: TelegramId,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users SET telegram_id = $2
            WHERE id = $1 AND (telegram_id IS NULL OR telegram_id = $2)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "telegram account is linked to another user"))?;

        match row {
            Some(row) => Ok(row.into()),
            None if self.fetch_user(id).await?.is_some() => Err(RepositoryError::Conflict(
                "user is linked to another telegram account".to_owned(),
            )),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn set_delivery_address(
        &self,
        id: UserId,
        address: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET delivery_address = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::from).ok_or(RepositoryError::NotFound)
    }

    async fn issue_token(&self, user_id: UserId, key: &str) -> Result<String, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO api_tokens (key, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(key)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "token"))?;

        let (key,): (String,) = sqlx::query_as("SELECT key FROM api_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(key)
    }

    async fn find_user_by_token(&self, key: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT u.id, u.username, u.display_name, u.phone_number, u.telegram_id,
                   u.delivery_address, u.role, u.created_at
            FROM api_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.key = $1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn list_users_without_token(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT u.id, u.username, u.display_name, u.phone_number, u.telegram_id,
                   u.delivery_address, u.role, u.created_at
            FROM users u
            LEFT JOIN api_tokens t ON t.user_id = u.id
            WHERE t.key IS NULL
            ORDER BY u.id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, image FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, image FROM products WHERE id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (name, price, image)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, image
            ",
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.image)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders (user_id, delivery_address)
            VALUES ($1, $2)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(&order.delivery_address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "unknown user"))?;

        let product_ids: Vec<i32> = order.product_ids.iter().map(ProductId::as_i32).collect();
        sqlx::query(
            r"
            INSERT INTO order_products (order_id, product_id)
            SELECT $1, UNNEST($2::int4[])
            ",
        )
        .bind(row.id)
        .bind(&product_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "unknown product"))?;

        tx.commit().await?;

        self.attach_one(row).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.attach_one(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_orders(&self, owner: Option<UserId>) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE $1::int4 IS NULL OR user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        self.attach_products(rows).await
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.attach_one(row).await,
            None if self.get_order(id).await?.is_some() => Err(RepositoryError::Conflict(
                format!("order {id} is no longer {from}"),
            )),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn orders_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at, id
            "
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        self.attach_products(rows).await
    }

    async fn insert_report(&self, report: NewReport) -> Result<Report, RepositoryError> {
        let f = &report.figures;
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            r"
            INSERT INTO reports (
                date, window_start, window_end, total_orders, total_revenue,
                pending_orders, pending_revenue, processing_orders, processing_revenue,
                delivering_orders, delivering_revenue, completed_orders, completed_revenue,
                canceled_orders, canceled_revenue
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {REPORT_COLUMNS}
            "
        ))
        .bind(report.date)
        .bind(report.window_start)
        .bind(report.window_end)
        .bind(count_to_db(f.total_orders)?)
        .bind(f.total_revenue)
        .bind(count_to_db(f.pending.orders)?)
        .bind(f.pending.revenue)
        .bind(count_to_db(f.processing.orders)?)
        .bind(f.processing.revenue)
        .bind(count_to_db(f.delivering.orders)?)
        .bind(f.delivering.revenue)
        .bind(count_to_db(f.completed.orders)?)
        .bind(f.completed.revenue)
        .bind(count_to_db(f.canceled.orders)?)
        .bind(f.canceled.revenue)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn latest_report(&self) -> Result<Option<Report>, RepositoryError> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Report::try_from).transpose()
    }
}
