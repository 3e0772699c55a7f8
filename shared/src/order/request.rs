//! Request DTOs for order submission and status updates

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{OrderItem, PaymentMethod};
use crate::order::OrderStatus;

/// Create-order request
///
/// `request_id` is the client-generated idempotency key. Retries of the
/// same logical submission must reuse it; the server maps it to the order
/// it produced, so a retry returns the already-persisted record instead of
/// allocating a second token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Idempotency key
    pub request_id: String,
    /// Target canteen. Optional at the wire level so a missing value is
    /// rejected as a structured validation error rather than a
    /// deserialization failure.
    #[serde(default)]
    pub canteen_id: Option<String>,
    /// Submitting customer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Order lines (must be non-empty)
    pub items: Vec<OrderItem>,
    /// Order total
    pub total: Decimal,
    /// Estimated preparation time in minutes
    #[serde(default)]
    pub estimated_minutes: u32,
    /// Payment method
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl CreateOrderRequest {
    /// Build a request with a fresh idempotency key
    pub fn new(canteen_id: impl Into<String>, items: Vec<OrderItem>, total: Decimal) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            canteen_id: Some(canteen_id.into()),
            user_id: None,
            items,
            total,
            estimated_minutes: 0,
            payment_method: PaymentMethod::default(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = minutes;
        self
    }
}

/// Status-update request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status
    pub status: OrderStatus,
}
