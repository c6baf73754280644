//! Status enums for accounts, orders and contact messages.
//!
//! JSON uses `SCREAMING_SNAKE_CASE` (`"IN_PROGRESS"`), Postgres enum labels
//! use `snake_case` (`'in_progress'`).

use serde::{Deserialize, Serialize};

/// Account role. Admin routes require [`UserRole::Admin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Whether this role may use the back-office.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "USER"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" | "user" => Ok(Self::User),
            "ADMIN" | "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Rejected order status change.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot change order status from {from} to {to}")]
pub struct InvalidTransition {
    /// Current status.
    pub from: OrderStatus,
    /// Requested status.
    pub to: OrderStatus,
}

/// Order lifecycle.
///
/// ```text
/// PENDING ──▶ PROCESSING ──▶ SHIPPED ──▶ DELIVERED
///    │            │
///    └────────────┴──▶ CANCELLED
/// ```
///
/// `DELIVERED` and `CANCELLED` are terminal. Requesting the current status
/// again is accepted as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Paid and recorded, not yet picked.
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Statuses reachable in one step from `self`.
    #[must_use]
    pub const fn next_statuses(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Whether no further changes are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.next_statuses().is_empty()
    }

    /// Check a requested change against the transition table.
    ///
    /// Returns `Ok(true)` when the status actually changes and `Ok(false)`
    /// when `to == self`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when `to` is not reachable from `self`.
    pub fn transition_to(self, to: Self) -> Result<bool, InvalidTransition> {
        if to == self {
            return Ok(false);
        }
        if self.next_statuses().contains(&to) {
            Ok(true)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }

    /// Whether moving to `to` hands the reserved units back to stock.
    #[must_use]
    pub fn releases_stock(self, to: Self) -> bool {
        to == Self::Cancelled && self != Self::Cancelled
    }

    /// Label shown in the back-office.
    #[must_use]
    pub const fn admin_label(self) -> &'static str {
        match self {
            Self::Pending => "保留中",
            Self::Processing => "処理中",
            Self::Shipped => "発送済み",
            Self::Delivered => "配達完了",
            Self::Cancelled => "キャンセル",
        }
    }

    /// Label shown to customers on their order history.
    #[must_use]
    pub const fn customer_label(self) -> &'static str {
        match self {
            Self::Pending => "処理中",
            Self::Processing => "発送準備中",
            Self::Shipped => "発送済み",
            Self::Delivered => "配達完了",
            Self::Cancelled => "キャンセル",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Shipped => write!(f, "SHIPPED"),
            Self::Delivered => write!(f, "DELIVERED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Contact message triage state. Any state may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.contact_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactStatus {
    #[default]
    Unread,
    Read,
    InProgress,
    Resolved,
}

impl ContactStatus {
    /// Every status, in triage order.
    pub const ALL: [Self; 4] = [Self::Unread, Self::Read, Self::InProgress, Self::Resolved];

    /// Label shown in the back-office.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unread => "未読",
            Self::Read => "既読",
            Self::InProgress => "対応中",
            Self::Resolved => "解決済み",
        }
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unread => write!(f, "UNREAD"),
            Self::Read => write!(f, "READ"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("invalid contact status: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert_eq!(OrderStatus::Pending.transition_to(OrderStatus::Processing), Ok(true));
        assert_eq!(OrderStatus::Processing.transition_to(OrderStatus::Shipped), Ok(true));
        assert_eq!(OrderStatus::Shipped.transition_to(OrderStatus::Delivered), Ok(true));
    }

    #[test]
    fn test_cancel_only_before_shipping() {
        assert!(OrderStatus::Pending.transition_to(OrderStatus::Cancelled).is_ok());
        assert!(OrderStatus::Processing.transition_to(OrderStatus::Cancelled).is_ok());
        assert!(OrderStatus::Shipped.transition_to(OrderStatus::Cancelled).is_err());
        assert!(OrderStatus::Delivered.transition_to(OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_terminal_statuses_reject_everything_else() {
        for to in OrderStatus::ALL {
            if to != OrderStatus::Cancelled {
                assert_eq!(
                    OrderStatus::Cancelled.transition_to(to),
                    Err(InvalidTransition {
                        from: OrderStatus::Cancelled,
                        to
                    })
                );
            }
        }
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_same_status_is_noop() {
        for status in OrderStatus::ALL {
            assert_eq!(status.transition_to(status), Ok(false));
        }
    }

    #[test]
    fn test_no_backwards_moves() {
        assert!(OrderStatus::Shipped.transition_to(OrderStatus::Pending).is_err());
        assert!(OrderStatus::Processing.transition_to(OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_releases_stock_only_when_cancelling() {
        assert!(OrderStatus::Pending.releases_stock(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.releases_stock(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.releases_stock(OrderStatus::Processing));
    }

    #[test]
    fn test_json_uses_screaming_case() {
        let json = serde_json::to_string(&ContactStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let status: OrderStatus = serde_json::from_str("\"SHIPPED\"").unwrap();
        assert_eq!(status, OrderStatus::Shipped);
    }

    #[test]
    fn test_from_str_roundtrips_display() {
        for status in ContactStatus::ALL {
            assert_eq!(status.to_string().parse::<ContactStatus>(), Ok(status));
        }
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert!("owner".parse::<UserRole>().is_err());
    }
}
