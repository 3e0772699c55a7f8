//! Order record - the authoritative representation persisted by the server
//!
//! Change-feed events carry a full copy of this record rather than a diff,
//! so client merge logic stays idempotent under duplicated or reordered
//! delivery.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::OrderStatus;

/// Payment method selected at submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Upi,
    Card,
    Cash,
    MealPlan,
}

/// Single order line
///
/// A menu snapshot taken at submission time. Lines are immutable after
/// creation - there are no partial edits to a placed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Dish name
    pub name: String,
    /// Quantity ordered
    pub quantity: u32,
    /// Unit price
    pub price: Decimal,
}

/// Order - the persisted record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Order ID (assigned by server)
    pub id: String,
    /// Owning canteen
    pub canteen_id: String,
    /// Owning customer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Idempotency key of the create request that produced this order.
    /// Retries and feed-first reconciliation match on this, since the
    /// client never knows the final `id` up front.
    pub request_id: String,
    /// Daily pickup token, unique within `(canteen_id, token_date)`
    pub token_number: u64,
    /// Calendar day the token belongs to (YYYYMMDD, business timezone)
    pub token_date: u32,
    /// Order lines
    pub items: Vec<OrderItem>,
    /// Order total
    pub total: Decimal,
    /// Estimated preparation time in minutes
    #[serde(default)]
    pub estimated_minutes: u32,
    /// Payment method
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Order status
    pub status: OrderStatus,
    /// Creation timestamp (Unix millis)
    pub created_at: i64,
    /// Pickup timestamp (Unix millis) - set exactly once on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl Order {
    /// Check if the order is still moving through the kitchen
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Human-facing pickup label, e.g. "#12"
    pub fn token_label(&self) -> String {
        format!("#{}", self.token_number)
    }
}
