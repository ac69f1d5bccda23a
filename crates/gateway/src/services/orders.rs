//! Order service: creation, role-scoped reads and the status workflow.
//!
//! Permission checks go through [`Role::can`] and status rules through
//! [`OrderStatus::transition_to`]; the store only persists.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use petal_core::{Capability, OrderId, OrderStatus, ProductId, Transition};

use super::notify::OrderEvent;
use crate::db::{OrderStore, RepositoryError};
use crate::error::AppError;
use crate::models::{NewOrder, Order, User};

/// Maximum stored length of a delivery address.
pub const MAX_ADDRESS_LEN: usize = 255;

/// Outcome of a status update request.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// The order as stored after the request.
    pub order: Order,
    /// Whether the status actually changed.
    pub transition: Transition,
}

/// Order service.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    events: broadcast::Sender<OrderEvent>,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, events: broadcast::Sender<OrderEvent>) -> Self {
        Self { store, events }
    }

    /// Place an order for `customer`.
    ///
    /// Duplicate product IDs are collapsed. When no address is given the
    /// customer's saved address is used.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `product_ids` is empty, names an unknown
    /// product, or the resulting address is blank or too long.
    #[instrument(skip(self, customer, delivery_address), fields(user_id = %customer.id))]
    pub async fn create(
        &self,
        customer: &User,
        product_ids: Vec<ProductId>,
        delivery_address: Option<String>,
    ) -> Result<Order, AppError> {
        let mut product_ids = product_ids;
        product_ids.sort_unstable();
        product_ids.dedup();

        if product_ids.is_empty() {
            return Err(AppError::Validation(
                "product_ids must not be empty".to_string(),
            ));
        }

        let known = self.store.get_products(&product_ids).await?;
        if known.len() != product_ids.len() {
            let missing: Vec<String> = product_ids
                .iter()
                .filter(|id| !known.iter().any(|p| p.id == **id))
                .map(ToString::to_string)
                .collect();
            return Err(AppError::Validation(format!(
                "unknown products: {}",
                missing.join(", ")
            )));
        }

        let address = match delivery_address {
            Some(address) => address,
            None => customer.delivery_address.clone().unwrap_or_default(),
        };
        let address = normalize_address(&address)?;

        let order = self
            .store
            .insert_order(NewOrder {
                user_id: customer.id,
                product_ids,
                delivery_address: Some(address),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => AppError::Validation(msg),
                other => other.into(),
            })?;

        info!(order_id = %order.id, total = %order.total_price, "Order created");
        self.publish(OrderEvent::Created {
            order: order.clone(),
            customer: customer.name().to_string(),
        });

        Ok(order)
    }

    /// Get one order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown ID and `Forbidden` when a customer
    /// asks for someone else's order.
    #[instrument(skip(self, requester), fields(user_id = %requester.id))]
    pub async fn get(&self, requester: &User, id: OrderId) -> Result<Order, AppError> {
        let order = self.load(id).await?;
        if order.user_id != requester.id && !requester.role.can(Capability::ViewAllOrders) {
            return Err(AppError::Forbidden(
                "you can only view your own orders".to_string(),
            ));
        }
        Ok(order)
    }

    /// Orders visible to `requester`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    #[instrument(skip(self, requester), fields(user_id = %requester.id))]
    pub async fn list(&self, requester: &User) -> Result<Vec<Order>, AppError> {
        let owner = (!requester.role.can(Capability::ViewAllOrders)).then_some(requester.id);
        Ok(self.store.list_orders(owner).await?)
    }

    /// Move an order to `status`.
    ///
    /// Requesting the status the order already has succeeds without writing
    /// or publishing anything.
    ///
    /// # Errors
    ///
    /// In order of precedence: `NotFound` for an unknown order, `Forbidden`
    /// unless the requester may change statuses, `InvalidStatus` for a value
    /// outside the enum, `InvalidTransition` when the workflow forbids the
    /// move, and `Conflict` when another request changed the order first.
    #[instrument(skip(self, requester), fields(user_id = %requester.id))]
    pub async fn update_status(
        &self,
        requester: &User,
        id: OrderId,
        status: &str,
    ) -> Result<StatusUpdate, AppError> {
        let order = self.load(id).await?;

        if !requester.role.can(Capability::ChangeOrderStatus) {
            return Err(AppError::Forbidden(
                "only staff can change order status".to_string(),
            ));
        }

        let to: OrderStatus = status.parse()?;
        let from = order.status;

        match from.transition_to(to)? {
            Transition::Unchanged => {
                debug!(order_id = %id, status = %to, "Status already applied");
                Ok(StatusUpdate {
                    order,
                    transition: Transition::Unchanged,
                })
            }
            Transition::Applied => {
                let updated = self.store.update_order_status(id, from, to).await?;
                info!(order_id = %id, %from, %to, "Order status changed");
                self.publish(OrderEvent::StatusChanged {
                    order: updated.clone(),
                    from,
                });
                Ok(StatusUpdate {
                    order: updated,
                    transition: Transition::Applied,
                })
            }
        }
    }

    async fn load(&self, id: OrderId) -> Result<Order, AppError> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    fn publish(&self, event: OrderEvent) {
        // Sending fails only when nobody listens.
        if self.events.send(event).is_err() {
            debug!("No order event subscribers");
        }
    }
}

/// Trim an address and check it is usable.
///
/// # Errors
///
/// Returns `Validation` if the address is blank or longer than
/// [`MAX_ADDRESS_LEN`].
pub fn normalize_address(address: &str) -> Result<String, AppError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AppError::Validation(
            "delivery_address must not be blank".to_string(),
        ));
    }
    if address.chars().count() > MAX_ADDRESS_LEN {
        return Err(AppError::Validation(format!(
            "delivery_address must be at most {MAX_ADDRESS_LEN} characters"
        )));
    }
    Ok(address.to_string())
}
