//! Status enums for orders, customers and admins.
//!
//! Each enum maps to a `PostgreSQL` enum type of the same name (see the
//! `zolar-db` migrations) when the `postgres` feature is enabled.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle of a cash-on-delivery order.
///
/// ```text
/// pending -> confirmed -> shipped -> delivered
///    \           \
///     +-----------+--> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Whether an admin may move an order from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Delivered and cancelled orders never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Snake-case name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Payment method. Cash on delivery is the only one the store offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "cod")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "cod"))]
    CashOnDelivery,
}

/// Customer loyalty tier, derived from order history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "customer_tier", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CustomerTier {
    /// No orders yet.
    #[default]
    New,
    /// 1-2 orders.
    Regular,
    /// 3-9 orders.
    Loyal,
    /// 10+ orders, or lifetime spend at or above [`CustomerTier::VIP_SPEND`].
    Vip,
}

impl CustomerTier {
    /// Orders needed to become `Loyal`.
    pub const LOYAL_ORDERS: i32 = 3;
    /// Orders needed to become `Vip`.
    pub const VIP_ORDERS: i32 = 10;
    /// Lifetime spend that makes a customer `Vip` regardless of order count.
    pub const VIP_SPEND: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);

    /// Tier for a customer with the given history.
    #[must_use]
    pub fn for_history(total_orders: i32, total_spent: Decimal) -> Self {
        if total_orders >= Self::VIP_ORDERS || total_spent >= Self::VIP_SPEND {
            Self::Vip
        } else if total_orders >= Self::LOYAL_ORDERS {
            Self::Loyal
        } else if total_orders >= 1 {
            Self::Regular
        } else {
            Self::New
        }
    }

    /// Snake-case name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Regular => "regular",
            Self::Loyal => "loyal",
            Self::Vip => "vip",
        }
    }
}

impl std::str::FromStr for CustomerTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "regular" => Ok(Self::Regular),
            "loyal" => Ok(Self::Loyal),
            "vip" => Ok(Self::Vip),
            _ => Err(format!("invalid customer tier: {s}")),
        }
    }
}

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Everything, including managing other admins.
    SuperAdmin,
    /// Catalog, orders, customers and content.
    Admin,
    /// Read-only access to the dashboard.
    Viewer,
}

impl AdminRole {
    /// Whether this role may call write endpoints.
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::{Cancelled, Confirmed, Delivered, Pending, Shipped};

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Delivered));

        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_order_status_from_str() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_method_serializes_as_cod() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::CashOnDelivery).ok().as_deref(),
            Some("\"cod\"")
        );
    }

    #[test]
    fn test_customer_tier_thresholds() {
        let spent = Decimal::new(1_000, 0);
        assert_eq!(CustomerTier::for_history(0, Decimal::ZERO), CustomerTier::New);
        assert_eq!(CustomerTier::for_history(1, spent), CustomerTier::Regular);
        assert_eq!(CustomerTier::for_history(2, spent), CustomerTier::Regular);
        assert_eq!(CustomerTier::for_history(3, spent), CustomerTier::Loyal);
        assert_eq!(CustomerTier::for_history(9, spent), CustomerTier::Loyal);
        assert_eq!(CustomerTier::for_history(10, spent), CustomerTier::Vip);
    }

    #[test]
    fn test_customer_tier_big_spender_is_vip() {
        assert_eq!(
            CustomerTier::for_history(1, Decimal::new(50_000, 0)),
            CustomerTier::Vip
        );
        assert_eq!(
            CustomerTier::for_history(1, Decimal::new(4_999_999, 2)),
            CustomerTier::Regular
        );
    }

    #[test]
    fn test_admin_role_write_access() {
        assert!(AdminRole::SuperAdmin.can_write());
        assert!(AdminRole::Admin.can_write());
        assert!(!AdminRole::Viewer.can_write());
        assert_eq!("viewer".parse::<AdminRole>(), Ok(AdminRole::Viewer));
    }
}
