//! User roles and capability checks.
//!
//! Every permission decision in the gateway and the bot goes through
//! [`Role::can`], so there is exactly one place that says who may do what.

use serde::{Deserialize, Serialize};

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shop customer. Sees and creates only their own orders.
    #[default]
    Customer,
    /// Florist or courier. Manages every order and sees reports.
    Staff,
    /// Full access, including reports and the admin notifications.
    Admin,
}

/// Something a principal may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Read and create orders owned by the principal.
    ManageOwnOrders,
    /// Read every order regardless of owner.
    ViewAllOrders,
    /// Move an order to another status.
    ChangeOrderStatus,
    /// Read and generate sales reports.
    ViewReports,
}

impl Role {
    /// Whether this role grants the capability.
    #[must_use]
    pub const fn can(self, capability: Capability) -> bool {
        match capability {
            Capability::ManageOwnOrders => true,
            Capability::ViewAllOrders
            | Capability::ChangeOrderStatus
            | Capability::ViewReports => matches!(self, Self::Staff | Self::Admin),
        }
    }

    /// Whether this role belongs to shop personnel.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Staff | Self::Admin)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_capabilities() {
        assert!(Role::Customer.can(Capability::ManageOwnOrders));
        assert!(!Role::Customer.can(Capability::ViewAllOrders));
        assert!(!Role::Customer.can(Capability::ChangeOrderStatus));
        assert!(!Role::Customer.can(Capability::ViewReports));
    }

    #[test]
    fn test_staff_and_admin_capabilities() {
        for role in [Role::Staff, Role::Admin] {
            assert!(role.can(Capability::ViewAllOrders));
            assert!(role.can(Capability::ChangeOrderStatus));
            assert!(role.can(Capability::ViewReports));
        }
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Customer, Role::Staff, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
