//! Order status workflow.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in the kitchen workflow.
///
/// Transitions:
/// ```text
/// Pending ──► Processing ──► Completed
///    │            │
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order has been placed and is waiting for the kitchen.
    #[default]
    Pending,

    /// The kitchen is preparing the order.
    Processing,

    /// Order has been served (terminal state).
    Completed,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns true if an order in this status may be moved to `next`.
    ///
    /// Re-applying the current status is always allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Processing)
                | (OrderStatus::Processing, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Processing, OrderStatus::Cancelled)
        )
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known order status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status: {0}")]
pub struct ParseOrderStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseOrderStatusError(s.to_string()))
    }
}
