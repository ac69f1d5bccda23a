//! Order status workflow.
//!
//! ```text
//! pending ──▶ processing ──▶ delivering ──▶ completed
//!    │            │              │
//!    └────────────┴──────────────┴──────▶ canceled
//! ```
//!
//! Moves are forward-only along the main line (skipping ahead is allowed),
//! `canceled` is reachable from any non-terminal status, and `completed` /
//! `canceled` are terminal. Requesting the status an order already has is an
//! idempotent no-op rather than an error.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed by the customer, not yet picked up by staff.
    #[default]
    Pending,
    /// Bouquet is being assembled.
    Processing,
    /// Handed to the courier.
    Delivering,
    /// Delivered.
    Completed,
    /// Canceled before delivery.
    Canceled,
}

/// Errors produced when validating a status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The requested status is not one of the known values.
    #[error("unknown order status: {0}")]
    InvalidStatus(String),

    /// The workflow does not allow this move.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
}

/// Result of a valid transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status changes and must be persisted.
    Applied,
    /// The order already has the requested status; nothing to do.
    Unchanged,
}

impl OrderStatus {
    /// All statuses in workflow order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Delivering,
        Self::Completed,
        Self::Canceled,
    ];

    /// Stable lowercase name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Delivering => "delivering",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    /// Human-readable label for chat messages and exports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "In progress",
            Self::Delivering => "Out for delivery",
            Self::Completed => "Completed",
            Self::Canceled => "Canceled",
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Position on the forward line; `None` for `canceled`.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::Delivering => Some(2),
            Self::Completed => Some(3),
            Self::Canceled => None,
        }
    }

    /// Validate a move from `self` to `to`.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::InvalidTransition` if the workflow forbids
    /// the move.
    pub fn transition_to(self, to: Self) -> Result<Transition, TransitionError> {
        if self == to {
            return Ok(Transition::Unchanged);
        }
        if self.is_terminal() {
            return Err(TransitionError::InvalidTransition { from: self, to });
        }
        if to == Self::Canceled {
            return Ok(Transition::Applied);
        }
        match (self.rank(), to.rank()) {
            (Some(from), Some(target)) if target > from => Ok(Transition::Applied),
            _ => Err(TransitionError::InvalidTransition { from: self, to }),
        }
    }

    /// Statuses reachable from `self` with an applied transition.
    pub fn next_statuses(self) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .filter(move |to| self.transition_to(*to) == Ok(Transition::Applied))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| TransitionError::InvalidStatus(s.to_string()))
    }
}

/// Status change offered as a chat button.
///
/// This is the single mapping from button actions to target statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    /// Staff accepted the order.
    Confirm,
    /// Courier took the order.
    InDelivery,
    /// Order was delivered.
    Complete,
    /// Order was canceled.
    Cancel,
}

impl StatusAction {
    /// All actions in button order.
    pub const ALL: [Self; 4] = [Self::Confirm, Self::InDelivery, Self::Complete, Self::Cancel];

    /// Status the action moves an order to.
    #[must_use]
    pub const fn target(self) -> OrderStatus {
        match self {
            Self::Confirm => OrderStatus::Processing,
            Self::InDelivery => OrderStatus::Delivering,
            Self::Complete => OrderStatus::Completed,
            Self::Cancel => OrderStatus::Canceled,
        }
    }

    /// Payload prefix used in callback data.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::InDelivery => "in_delivery",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }

    /// Button caption.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Confirm => "✅ Confirm",
            Self::InDelivery => "🚚 In delivery",
            Self::Complete => "📦 Complete",
            Self::Cancel => "❌ Cancel",
        }
    }

    /// Actions whose target is a valid move from `status`.
    #[must_use]
    pub fn available_for(status: OrderStatus) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|action| status.transition_to(action.target()) == Ok(Transition::Applied))
            .collect()
    }
}

impl FromStr for StatusAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}

impl std::fmt::Display for StatusAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
