//! Change-feed events - full order snapshots pushed to subscribers

use serde::{Deserialize, Serialize};

use crate::models::Order;

/// Event kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedEventKind {
    Insert,
    Update,
}

/// Change-feed event
///
/// Carries the full current order record. Delivery is at-least-once and
/// may be reordered; receivers merge by `order.id` and must converge on
/// the same state regardless of arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderFeedEvent {
    /// Event kind
    #[serde(rename = "type")]
    pub kind: FeedEventKind,
    /// Current order record at emission time
    pub order: Order,
}

impl OrderFeedEvent {
    pub fn insert(order: Order) -> Self {
        Self {
            kind: FeedEventKind::Insert,
            order,
        }
    }

    pub fn update(order: Order) -> Self {
        Self {
            kind: FeedEventKind::Update,
            order,
        }
    }
}

/// Subscription scope - server-side ownership filter
///
/// A subscriber tied to a canteen only ever observes that canteen's
/// orders; a subscriber tied to a user only ever observes their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    Canteen(String),
    User(String),
}

impl FeedScope {
    /// Whether an order belongs to this subscriber
    pub fn covers(&self, order: &Order) -> bool {
        match self {
            FeedScope::Canteen(id) => order.canteen_id == *id,
            FeedScope::User(id) => order.user_id.as_deref() == Some(id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use rust_decimal::Decimal;

    fn order(canteen: &str, user: Option<&str>) -> Order {
        Order {
            id: "order:1".to_string(),
            canteen_id: canteen.to_string(),
            user_id: user.map(str::to_string),
            request_id: "req-1".to_string(),
            token_number: 1,
            token_date: 20260805,
            items: vec![],
            total: Decimal::ZERO,
            estimated_minutes: 0,
            payment_method: Default::default(),
            status: OrderStatus::Pending,
            created_at: 0,
            completed_at: None,
        }
    }

    #[test]
    fn test_canteen_scope_excludes_other_canteens() {
        let scope = FeedScope::Canteen("c1".to_string());
        assert!(scope.covers(&order("c1", None)));
        assert!(!scope.covers(&order("c2", None)));
    }

    #[test]
    fn test_user_scope_excludes_other_users_and_anonymous() {
        let scope = FeedScope::User("u1".to_string());
        assert!(scope.covers(&order("c1", Some("u1"))));
        assert!(!scope.covers(&order("c1", Some("u2"))));
        assert!(!scope.covers(&order("c1", None)));
    }
}
