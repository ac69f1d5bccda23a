//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::GatewayConfig;
use crate::db::OrderStore;
use crate::services::notify::{EVENT_CAPACITY, OrderEvent};
use crate::services::{OrderService, ReportService, UserService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the order store, the services built on it and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GatewayConfig,
    store: Arc<dyn OrderStore>,
    orders: OrderService,
    reports: ReportService,
    users: UserService,
    events: broadcast::Sender<OrderEvent>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Gateway configuration
    /// * `store` - Order store backend
    #[must_use]
    pub fn new(config: GatewayConfig, store: Arc<dyn OrderStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let orders = OrderService::new(Arc::clone(&store), events.clone());
        let reports =
            ReportService::new(Arc::clone(&store)).with_staleness(config.report_staleness_days);
        let users = UserService::new(Arc::clone(&store));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                orders,
                reports,
                users,
                events,
            }),
        }
    }

    /// Get a reference to the gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn store(&self) -> &dyn OrderStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    /// Get a reference to the report service.
    #[must_use]
    pub fn reports(&self) -> &ReportService {
        &self.inner.reports
    }

    /// Get a reference to the user service.
    #[must_use]
    pub fn users(&self) -> &UserService {
        &self.inner.users
    }

    /// Subscribe to order events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.inner.events.subscribe()
    }
}
