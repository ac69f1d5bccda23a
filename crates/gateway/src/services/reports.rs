//! Sales reports: aggregation, the read-through snapshot cache and CSV export.
//!
//! A window `[start_date, end_date]` covers whole days in UTC; the store is
//! queried with the half-open instant range `[start_date 00:00, end_date + 1
//! day 00:00)`.

use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime};
use tracing::{debug, info, instrument};

use petal_core::ReportFigures;

use crate::db::OrderStore;
use crate::error::AppError;
use crate::models::{NewReport, Order, Report};

/// Length of the window used by the cache and the CSV export.
pub const DEFAULT_WINDOW_DAYS: u64 = 30;

/// Age in days at which a cached snapshot is regenerated.
pub const DEFAULT_STALENESS_DAYS: i64 = 30;

/// Report service.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn OrderStore>,
    staleness_days: i64,
}

impl ReportService {
    /// Create a report service that reuses snapshots for
    /// [`DEFAULT_STALENESS_DAYS`] days.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            store,
            staleness_days: DEFAULT_STALENESS_DAYS,
        }
    }

    /// Reuse cached snapshots younger than `days`.
    #[must_use]
    pub const fn with_staleness(mut self, days: i64) -> Self {
        self.staleness_days = days;
        self
    }

    /// Aggregate orders created between `start` and `end` (both inclusive)
    /// and persist the snapshot, dated `today`.
    ///
    /// Returns `None` when the window holds no orders; nothing is stored then.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `end` precedes `start` or lies after `today`,
    /// or a store error.
    #[instrument(skip(self))]
    pub async fn generate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<Option<Report>, AppError> {
        if end > today {
            return Err(AppError::Validation(
                "end_date must not be in the future".to_string(),
            ));
        }
        let orders = self.orders_between(start, end).await?;
        debug!(count = orders.len(), "Orders in report window");

        let Some(figures) =
            ReportFigures::from_orders(orders.iter().map(|o| (o.status, o.total_price)))
        else {
            info!("No orders in window, report skipped");
            return Ok(None);
        };

        let report = self
            .store
            .insert_report(NewReport {
                date: today,
                window_start: start,
                window_end: end,
                figures,
            })
            .await?;

        info!(
            report_id = %report.id,
            total_orders = report.figures.total_orders,
            total_revenue = %report.figures.total_revenue,
            "Report generated"
        );
        Ok(Some(report))
    }

    /// The latest snapshot if it is a fresh default-window one, otherwise a
    /// new one for the last [`DEFAULT_WINDOW_DAYS`] days ending `today`.
    ///
    /// Concurrent callers may both regenerate and store duplicate snapshots.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    #[instrument(skip(self))]
    pub async fn latest_or_generate(&self, today: NaiveDate) -> Result<Option<Report>, AppError> {
        if let Some(report) = self.store.latest_report().await?
            && self.is_fresh(&report, today)
        {
            debug!(report_id = %report.id, "Serving cached report");
            return Ok(Some(report));
        }

        let start = window_start(today)?;
        self.generate(start, today, today).await
    }

    /// CSV of the orders created in the last [`DEFAULT_WINDOW_DAYS`] days,
    /// oldest first, with columns `date,order_id,customer,total,status`.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or a row cannot be written.
    #[instrument(skip(self))]
    pub async fn export_csv(&self, today: NaiveDate) -> Result<String, AppError> {
        let start = window_start(today)?;
        let orders = self.orders_between(start, today).await?;
        let users = self.store.list_users().await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["date", "order_id", "customer", "total", "status"])
            .map_err(|e| AppError::Internal(e.to_string()))?;

        for order in &orders {
            let customer = users
                .iter()
                .find(|u| u.id == order.user_id)
                .map_or("unknown", |u| u.username.as_str());
            writer
                .write_record([
                    order.created_at.format("%Y-%m-%d").to_string(),
                    order.id.to_string(),
                    customer.to_string(),
                    order.total_price.to_string(),
                    order.status.to_string(),
                ])
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Explicit windows never stand in for the default snapshot.
    fn is_fresh(&self, report: &Report, today: NaiveDate) -> bool {
        let default_window = report.window_end == report.date
            && window_start(report.date).is_ok_and(|start| start == report.window_start);
        let age = (today - report.date).num_days();
        default_window && (0..self.staleness_days).contains(&age)
    }

    async fn orders_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Order>, AppError> {
        if end < start {
            return Err(AppError::Validation(
                "end_date must not precede start_date".to_string(),
            ));
        }
        let until = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::Validation("end_date out of range".to_string()))?;

        Ok(self
            .store
            .orders_in_window(
                start.and_time(NaiveTime::MIN).and_utc(),
                until.and_time(NaiveTime::MIN).and_utc(),
            )
            .await?)
    }
}

fn window_start(today: NaiveDate) -> Result<NaiveDate, AppError> {
    today
        .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
        .ok_or_else(|| AppError::Internal(format!("date out of range: {today}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use petal_core::{OrderStatus, Price, ProductId, Role, UserId};

    use crate::db::MemoryStore;
    use crate::models::{NewOrder, NewProduct, NewUser};

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn at(s: &str) -> DateTime<Utc> {
        format!("{s}T12:00:00Z").parse().unwrap()
    }

    struct Shop {
        store: Arc<MemoryStore>,
        service: ReportService,
        user: UserId,
    }

    impl Shop {
        async fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let user = store
                .create_user(NewUser {
                    username: "anna".to_string(),
                    display_name: None,
                    phone_number: None,
                    telegram_id: None,
                    role: Role::Customer,
                })
                .await
                .unwrap()
                .id;
            let service = ReportService::new(store.clone());
            Self {
                store,
                service,
                user,
            }
        }

        async fn product(&self, cents: i64) -> ProductId {
            self.store
                .create_product(NewProduct {
                    name: format!("bouquet-{cents}"),
                    price: Price::from_cents(cents),
                    image: String::new(),
                })
                .await
                .unwrap()
                .id
        }

        async fn order(&self, cents: i64, status: OrderStatus, created: &str) {
            let product = self.product(cents).await;
            let order = self
                .store
                .insert_order_at(
                    NewOrder {
                        user_id: self.user,
                        product_ids: vec![product],
                        delivery_address: None,
                    },
                    at(created),
                )
                .await
                .unwrap();
            if status != OrderStatus::Pending {
                self.store
                    .update_order_status(order.id, OrderStatus::Pending, status)
                    .await
                    .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_canceled_revenue_excluded_from_total() {
        let shop = Shop::new().await;
        for cents in [1000, 2000, 3000] {
            shop.order(cents, OrderStatus::Completed, "2026-03-10").await;
        }
        shop.order(5000, OrderStatus::Canceled, "2026-03-11").await;

        let report = shop
            .service
            .generate(day("2026-03-01"), day("2026-03-31"), day("2026-04-02"))
            .await
            .unwrap()
            .unwrap();

        let f = report.figures;
        assert_eq!(f.completed.revenue, Price::from_cents(6000));
        assert_eq!(f.canceled.revenue, Price::from_cents(5000));
        assert_eq!(f.total_revenue, Price::from_cents(6000));
        assert_eq!(f.total_orders, 4);
        assert_eq!(report.date, day("2026-04-02"));
        assert_eq!(report.window_end, day("2026-03-31"));
    }

    #[tokio::test]
    async fn test_window_includes_end_day() {
        let shop = Shop::new().await;
        shop.order(1000, OrderStatus::Pending, "2026-03-31").await;
        shop.order(1000, OrderStatus::Pending, "2026-04-01").await;

        let report = shop
            .service
            .generate(day("2026-03-31"), day("2026-03-31"), day("2026-04-01"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.figures.total_orders, 1);
    }

    #[tokio::test]
    async fn test_empty_window_is_not_a_report() {
        let shop = Shop::new().await;
        let report = shop
            .service
            .generate(day("2026-03-01"), day("2026-03-31"), day("2026-03-31"))
            .await
            .unwrap();
        assert!(report.is_none());
        assert!(shop.store.latest_report().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reversed_window_is_rejected() {
        let shop = Shop::new().await;
        let err = shop
            .service
            .generate(day("2026-03-31"), day("2026-03-01"), day("2026-04-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_reused() {
        let shop = Shop::new().await;
        shop.order(1000, OrderStatus::Pending, "2026-03-20").await;

        let first = shop
            .service
            .latest_or_generate(day("2026-03-25"))
            .await
            .unwrap()
            .unwrap();

        // A later order does not show up while the snapshot is fresh.
        shop.order(2000, OrderStatus::Pending, "2026-03-26").await;
        let cached = shop
            .service
            .latest_or_generate(day("2026-04-10"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.id, first.id);

        let regenerated = shop
            .service
            .latest_or_generate(day("2026-04-24"))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(regenerated.id, first.id);
        assert_eq!(regenerated.window_start, day("2026-03-25"));
        assert_eq!(regenerated.figures.total_orders, 1);
    }

    #[tokio::test]
    async fn test_custom_staleness() {
        let shop = Shop::new().await;
        shop.order(1000, OrderStatus::Pending, "2026-03-20").await;
        let service = ReportService::new(shop.store.clone()).with_staleness(5);

        let first = service
            .latest_or_generate(day("2026-03-21"))
            .await
            .unwrap()
            .unwrap();
        let cached = service
            .latest_or_generate(day("2026-03-25"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.id, first.id);

        let regenerated = service
            .latest_or_generate(day("2026-03-26"))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(regenerated.id, first.id);
    }

    #[tokio::test]
    async fn test_future_window_is_rejected() {
        let shop = Shop::new().await;
        shop.order(1000, OrderStatus::Pending, "2026-03-20").await;

        let err = shop
            .service
            .generate(day("2026-03-01"), day("2099-12-31"), day("2026-03-25"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(shop.store.latest_report().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_explicit_window_does_not_replace_cached_snapshot() {
        let shop = Shop::new().await;
        shop.order(1000, OrderStatus::Pending, "2026-03-20").await;
        shop.order(2000, OrderStatus::Pending, "2026-03-24").await;

        let default = shop
            .service
            .latest_or_generate(day("2026-03-25"))
            .await
            .unwrap()
            .unwrap();
        let narrow = shop
            .service
            .generate(day("2026-03-20"), day("2026-03-20"), day("2026-03-25"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(narrow.figures.total_orders, 1);

        // The narrow snapshot is the newest row but the bot keeps seeing a
        // full window.
        let latest = shop
            .service
            .latest_or_generate(day("2026-03-26"))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(latest.id, narrow.id);
        assert_eq!(latest.window_start, default.window_start.succ_opt().unwrap());
        assert_eq!(latest.figures.total_orders, 2);
    }

    #[tokio::test]
    async fn test_snapshot_from_a_later_day_is_not_fresh() {
        let shop = Shop::new().await;
        shop.order(1000, OrderStatus::Pending, "2026-03-20").await;

        let later = shop
            .service
            .latest_or_generate(day("2026-05-01"))
            .await
            .unwrap();
        assert!(later.is_none());

        let first = shop
            .service
            .latest_or_generate(day("2026-03-25"))
            .await
            .unwrap()
            .unwrap();
        let again = shop
            .service
            .latest_or_generate(day("2026-03-24"))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(again.id, first.id);
        assert_eq!(again.date, day("2026-03-24"));
    }

    #[tokio::test]
    async fn test_export_csv() {
        let shop = Shop::new().await;
        shop.order(1550, OrderStatus::Completed, "2026-03-20").await;
        shop.order(990, OrderStatus::Pending, "2026-01-01").await;

        let csv = shop.service.export_csv(day("2026-03-25")).await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "date,order_id,customer,total,status");
        assert!(lines[1].starts_with("2026-03-20,"));
        assert!(lines[1].ends_with(",anna,15.50,completed"));
    }
}
