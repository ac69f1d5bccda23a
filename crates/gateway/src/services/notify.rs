//! Order events and the Telegram admin notifier.
//!
//! The order service publishes an [`OrderEvent`] on a broadcast channel after
//! every successful create or status change. When an admin chat is configured,
//! [`spawn_admin_notifier`] forwards each event as a chat message.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use petal_core::OrderStatus;

use crate::config::AdminChatConfig;
use crate::models::Order;

/// Telegram Bot API base URL.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Capacity of the event channel; slow subscribers skip older events.
pub const EVENT_CAPACITY: usize = 256;

/// Something that happened to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    /// A customer placed an order.
    Created {
        order: Order,
        customer: String,
    },
    /// Staff moved an order to `order.status`.
    StatusChanged { order: Order, from: OrderStatus },
}

impl OrderEvent {
    /// The order after the event.
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Created { order, .. } | Self::StatusChanged { order, .. } => order,
        }
    }

    /// Chat text announcing the event.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Created { order, customer } => format!(
                "🆕 New order #{id}\nCustomer: {customer}\nProducts: {products}\nTotal: {total}\nAddress: {address}",
                id = order.id,
                products = order.product_names(),
                total = order.total_price,
                address = order.delivery_address.as_deref().unwrap_or("not set"),
            ),
            Self::StatusChanged { order, from } => format!(
                "🔄 Order #{id}: {from} → {to}",
                id = order.id,
                from = from.label(),
                to = order.status.label(),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Errors from delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("Telegram request failed: {0}")]
    Request(String),

    /// Telegram rejected the message.
    #[error("Telegram API error: {0}")]
    Api(String),
}

/// Sends messages to the shop administrator's chat.
#[derive(Clone)]
pub struct AdminNotifier {
    client: Client,
    bot_token: SecretString,
    chat_id: i64,
    api_base: String,
}

impl std::fmt::Debug for AdminNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminNotifier")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl AdminNotifier {
    /// Create a notifier for the configured admin chat.
    #[must_use]
    pub fn new(config: &AdminChatConfig) -> Self {
        Self {
            client: Client::new(),
            bot_token: config.bot_token.clone(),
            chat_id: config.admin_chat_id,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Send a plain text message to the admin chat.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Telegram rejects the message.
    #[instrument(skip(self, text), fields(chat_id = self.chat_id))]
    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        );

        let response: ApiResponse = self
            .client
            .post(url)
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.without_url().to_string()))?
            .json()
            .await
            .map_err(|e| NotifyError::Request(e.without_url().to_string()))?;

        if !response.ok {
            return Err(NotifyError::Api(
                response
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!("Admin notification sent");
        Ok(())
    }
}

/// Forward order events to the admin chat until the channel closes.
pub fn spawn_admin_notifier(
    mut events: broadcast::Receiver<OrderEvent>,
    notifier: AdminNotifier,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(e) = notifier.send(&event.message()).await {
                        error!(error = %e, order_id = %event.order().id, "Failed to notify admin");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Admin notifier fell behind, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use petal_core::{OrderId, Price, ProductId, UserId};

    use crate::models::Product;

    fn order(status: OrderStatus) -> Order {
        Order::new(
            OrderId::new(17),
            UserId::new(2),
            vec![Product {
                id: ProductId::new(1),
                name: "Peonies".to_string(),
                price: Price::from_cents(4200),
                image: "products/peonies.jpg".to_string(),
            }],
            status,
            Utc::now(),
            None,
        )
    }

    #[test]
    fn test_created_message() {
        let event = OrderEvent::Created {
            order: order(OrderStatus::Pending),
            customer: "Anna".to_string(),
        };
        let text = event.message();
        assert!(text.contains("#17"));
        assert!(text.contains("Anna"));
        assert!(text.contains("Peonies"));
        assert!(text.contains("42.00"));
        assert!(text.contains("not set"));
    }

    #[test]
    fn test_status_changed_message() {
        let event = OrderEvent::StatusChanged {
            order: order(OrderStatus::Delivering),
            from: OrderStatus::Processing,
        };
        let text = event.message();
        assert!(text.contains(OrderStatus::Processing.label()));
        assert!(text.contains(OrderStatus::Delivering.label()));
    }

    #[test]
    fn test_debug_redacts_token() {
        let notifier = AdminNotifier::new(&AdminChatConfig {
            bot_token: SecretString::from("123:very_private"),
            admin_chat_id: 5,
        });
        let debug_output = format!("{notifier:?}");
        assert!(!debug_output.contains("very_private"));
    }
}
