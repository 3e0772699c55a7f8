//! Order reconciliation - one consistent view from three sources
//!
//! A submitting client learns about its order three ways, in no fixed
//! order: its own optimistic entry, the direct create response, and
//! change-feed events. [`OrderBook`] merges all of them into a single
//! list with no duplicates and no lost updates.
//!
//! # Protocol
//!
//! 1. On submit, [`OrderBook::submit_local`] inserts a placeholder entry
//!    keyed by the request's idempotency key. The UI shows it immediately
//!    with a "pending assignment" token.
//! 2. The create call carries the same idempotency key.
//! 3. On success, [`OrderBook::confirm`] swaps the placeholder for the
//!    server record (matched by idempotency key - the server assigns the
//!    final id). On definitive failure, [`OrderBook::fail`] removes the
//!    placeholder; no ghost entry survives.
//! 4. Feed events go through [`OrderBook::apply`] and merge by final id.
//!    Whichever of steps 3 and 4 happens first wins the replacement; the
//!    later one becomes a field-level merge, never a second row.
//!
//! # Merge semantics
//!
//! [`merge_orders`] is pure: union of non-null fields, `status` and
//! `completed_at` never move backward. Applying the same events in any
//! order, or applying an event twice, yields the same book - entries keep
//! a canonical sort (pending first, then newest first), so the result is
//! position-for-position identical, not just set-equal.
//!
//! All of this is synchronous and storage-free, testable without a server.

use rust_decimal::Decimal;
use shared::models::{Order, OrderItem};
use shared::order::OrderFeedEvent;

/// Placeholder token text shown while the real number is being assigned
pub const TOKEN_PENDING: &str = "…";

/// Optimistic placeholder for a submission in flight
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    /// Idempotency key of the in-flight create request
    pub request_id: String,
    /// Target canteen
    pub canteen_id: String,
    /// Order lines as submitted
    pub items: Vec<OrderItem>,
    /// Total as submitted
    pub total: Decimal,
    /// Local submission timestamp (Unix millis), for display ordering only
    pub submitted_at: i64,
}

impl PendingOrder {
    /// Token label while assignment is pending
    pub fn token_label(&self) -> &'static str {
        TOKEN_PENDING
    }
}

/// A row in the local order list
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEntry {
    /// Optimistic placeholder awaiting confirmation
    Pending(PendingOrder),
    /// Server-confirmed record
    Confirmed(Order),
}

/// Merge an incoming record into a local record of the same order
///
/// Keeps the union of non-null fields and never decreases `status`: if
/// the local record already shows a later state, the incoming status and
/// timestamps are ignored. Once `completed_at` is set it never changes.
pub fn merge_orders(local: &Order, incoming: &Order) -> Order {
    let (newer, older) = if incoming.status.rank() > local.status.rank() {
        (incoming, local)
    } else {
        (local, incoming)
    };
    let mut merged = newer.clone();
    merged.completed_at = newer.completed_at.or(older.completed_at);
    merged.user_id = newer.user_id.clone().or_else(|| older.user_id.clone());
    merged
}

/// Local view of one subscriber's order list
///
/// Scoped by construction: a student app holds one book for its user, a
/// canteen dashboard holds one for its canteen. There is no ambient
/// "current order" - query the book explicitly (e.g. [`OrderBook::active`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    entries: Vec<OrderEntry>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Mutations ==========

    /// Insert an optimistic placeholder for a submission in flight
    ///
    /// Re-submitting the same request id replaces the existing
    /// placeholder instead of adding a second row.
    pub fn submit_local(&mut self, pending: PendingOrder) {
        self.entries.retain(
            |entry| !matches!(entry, OrderEntry::Pending(p) if p.request_id == pending.request_id),
        );
        self.entries.push(OrderEntry::Pending(pending));
        self.normalize();
    }

    /// Apply the server's create response
    ///
    /// Matched by the order's idempotency key, not by any temporary id.
    /// If a feed event already delivered the record this degrades to a
    /// field merge.
    pub fn confirm(&mut self, order: Order) {
        self.upsert(order);
    }

    /// Remove the placeholder after a definitive failure
    ///
    /// Only for definitive rejections. A timed-out submission has an
    /// unknown outcome and must stay until resolved by idempotency key.
    pub fn fail(&mut self, request_id: &str) {
        self.entries
            .retain(|entry| !matches!(entry, OrderEntry::Pending(p) if p.request_id == request_id));
    }

    /// Apply a change-feed event
    ///
    /// Safe under at-least-once, unordered delivery: duplicates merge to
    /// the same state and an update arriving before its insert simply
    /// creates the row first.
    pub fn apply(&mut self, event: &OrderFeedEvent) {
        self.upsert(event.order.clone());
    }

    /// Merge a queried snapshot list (reconnect / lag recovery)
    pub fn resync(&mut self, orders: Vec<Order>) {
        for order in orders {
            self.upsert(order);
        }
    }

    fn upsert(&mut self, order: Order) {
        // 1. Already confirmed: merge by final id
        if let Some(entry) = self.entries.iter_mut().find(
            |entry| matches!(entry, OrderEntry::Confirmed(existing) if existing.id == order.id),
        ) {
            let OrderEntry::Confirmed(existing) = entry else {
                unreachable!()
            };
            *existing = merge_orders(existing, &order);
            self.normalize();
            return;
        }

        // 2. Matches an optimistic placeholder: swap it out
        if let Some(position) = self.entries.iter().position(
            |entry| matches!(entry, OrderEntry::Pending(p) if p.request_id == order.request_id),
        ) {
            self.entries[position] = OrderEntry::Confirmed(order);
            self.normalize();
            return;
        }

        // 3. Unseen order (feed-first arrival or resync)
        self.entries.push(OrderEntry::Confirmed(order));
        self.normalize();
    }

    /// Canonical display order: placeholders first (newest submission
    /// first), then confirmed records newest first. Keeping the sort
    /// canonical makes reconciliation order-independent.
    fn normalize(&mut self) {
        self.entries.sort_by(|a, b| match (a, b) {
            (OrderEntry::Pending(_), OrderEntry::Confirmed(_)) => std::cmp::Ordering::Less,
            (OrderEntry::Confirmed(_), OrderEntry::Pending(_)) => std::cmp::Ordering::Greater,
            (OrderEntry::Pending(x), OrderEntry::Pending(y)) => y
                .submitted_at
                .cmp(&x.submitted_at)
                .then_with(|| x.request_id.cmp(&y.request_id)),
            (OrderEntry::Confirmed(x), OrderEntry::Confirmed(y)) => y
                .created_at
                .cmp(&x.created_at)
                .then_with(|| x.id.cmp(&y.id)),
        });
    }

    // ========== Queries ==========

    /// All rows in display order
    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    /// Confirmed records in display order
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.entries.iter().filter_map(|entry| match entry {
            OrderEntry::Confirmed(order) => Some(order),
            OrderEntry::Pending(_) => None,
        })
    }

    /// Confirmed records still moving through the kitchen
    pub fn active(&self) -> impl Iterator<Item = &Order> {
        self.orders().filter(|order| order.is_open())
    }

    /// Find a confirmed record by id
    pub fn find(&self, order_id: &str) -> Option<&Order> {
        self.orders().find(|order| order.id == order_id)
    }

    /// Find a placeholder by its request id
    pub fn find_pending(&self, request_id: &str) -> Option<&PendingOrder> {
        self.entries.iter().find_map(|entry| match entry {
            OrderEntry::Pending(p) if p.request_id == request_id => Some(p),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PaymentMethod;
    use shared::order::OrderStatus;

    fn item() -> OrderItem {
        OrderItem {
            name: "Chole Bhature".to_string(),
            quantity: 1,
            price: Decimal::new(6000, 2),
        }
    }

    fn pending(request_id: &str, submitted_at: i64) -> PendingOrder {
        PendingOrder {
            request_id: request_id.to_string(),
            canteen_id: "c1".to_string(),
            items: vec![item()],
            total: Decimal::new(6000, 2),
            submitted_at,
        }
    }

    fn order(id: &str, request_id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            canteen_id: "c1".to_string(),
            user_id: Some("user:1".to_string()),
            request_id: request_id.to_string(),
            token_number: 7,
            token_date: 20260805,
            items: vec![item()],
            total: Decimal::new(6000, 2),
            estimated_minutes: 12,
            payment_method: PaymentMethod::Upi,
            status,
            created_at: 100,
            completed_at: if status == OrderStatus::Completed {
                Some(500)
            } else {
                None
            },
        }
    }

    #[test]
    fn test_optimistic_entry_shows_immediately() {
        let mut book = OrderBook::new();
        book.submit_local(pending("req-1", 50));
        assert_eq!(book.len(), 1);
        assert_eq!(book.find_pending("req-1").unwrap().token_label(), TOKEN_PENDING);
    }

    #[test]
    fn test_confirm_replaces_placeholder_by_request_id() {
        let mut book = OrderBook::new();
        book.submit_local(pending("req-1", 50));
        book.confirm(order("order:a", "req-1", OrderStatus::Pending));

        assert_eq!(book.len(), 1);
        assert!(book.find_pending("req-1").is_none());
        assert_eq!(book.find("order:a").unwrap().token_number, 7);
    }

    #[test]
    fn test_definitive_failure_leaves_no_ghost() {
        let mut book = OrderBook::new();
        book.submit_local(pending("req-1", 50));
        book.fail("req-1");
        assert!(book.is_empty());
    }

    #[test]
    fn test_feed_before_response_then_confirm_is_merge_not_duplicate() {
        let mut book = OrderBook::new();
        book.submit_local(pending("req-1", 50));

        // Feed insert wins the race
        book.apply(&OrderFeedEvent::insert(order("order:a", "req-1", OrderStatus::Pending)));
        assert_eq!(book.len(), 1);
        assert!(book.find("order:a").is_some());

        // The delayed direct response becomes a no-op merge
        book.confirm(order("order:a", "req-1", OrderStatus::Pending));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_response_before_feed_then_event_is_merge_not_duplicate() {
        let mut book = OrderBook::new();
        book.submit_local(pending("req-1", 50));
        book.confirm(order("order:a", "req-1", OrderStatus::Pending));

        book.apply(&OrderFeedEvent::insert(order("order:a", "req-1", OrderStatus::Pending)));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_timeout_then_feed_insert_resolves_placeholder() {
        // Submission timed out: no confirm() and no fail(), the entry
        // stays pending until the feed delivers the committed order
        let mut book = OrderBook::new();
        book.submit_local(pending("req-1", 50));

        book.apply(&OrderFeedEvent::insert(order("order:a", "req-1", OrderStatus::Pending)));

        assert_eq!(book.len(), 1);
        assert!(book.find_pending("req-1").is_none());
        assert_eq!(book.find("order:a").unwrap().request_id, "req-1");
    }

    #[test]
    fn test_update_arriving_before_insert_converges() {
        let mut book = OrderBook::new();
        book.apply(&OrderFeedEvent::update(order("order:a", "req-1", OrderStatus::Preparing)));
        assert_eq!(book.find("order:a").unwrap().status, OrderStatus::Preparing);

        // The delayed insert cannot walk the status back
        book.apply(&OrderFeedEvent::insert(order("order:a", "req-1", OrderStatus::Pending)));
        assert_eq!(book.len(), 1);
        assert_eq!(book.find("order:a").unwrap().status, OrderStatus::Preparing);
    }

    #[test]
    fn test_stale_event_never_unsets_completion() {
        let mut book = OrderBook::new();
        book.apply(&OrderFeedEvent::update(order("order:a", "req-1", OrderStatus::Completed)));
        book.apply(&OrderFeedEvent::update(order("order:a", "req-1", OrderStatus::Ready)));

        let merged = book.find("order:a").unwrap();
        assert_eq!(merged.status, OrderStatus::Completed);
        assert_eq!(merged.completed_at, Some(500));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut book = OrderBook::new();
        let event = OrderFeedEvent::insert(order("order:a", "req-1", OrderStatus::Pending));
        book.apply(&event);
        let once = book.clone();
        book.apply(&event);
        assert_eq!(book, once);
    }

    #[test]
    fn test_merge_is_commutative_across_event_permutations() {
        let events = [
            OrderFeedEvent::insert(order("order:a", "req-1", OrderStatus::Pending)),
            OrderFeedEvent::update(order("order:a", "req-1", OrderStatus::Preparing)),
            OrderFeedEvent::update(order("order:a", "req-1", OrderStatus::Ready)),
            OrderFeedEvent::insert(order("order:b", "req-2", OrderStatus::Pending)),
        ];

        let permutations: [[usize; 4]; 6] = [
            [0, 1, 2, 3],
            [3, 2, 1, 0],
            [1, 3, 0, 2],
            [2, 0, 3, 1],
            [0, 3, 1, 2],
            [2, 3, 0, 1],
        ];

        let mut reference: Option<OrderBook> = None;
        for perm in permutations {
            let mut book = OrderBook::new();
            for index in perm {
                book.apply(&events[index]);
            }
            match &reference {
                None => reference = Some(book),
                Some(expected) => assert_eq!(&book, expected),
            }
        }

        let book = reference.unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.find("order:a").unwrap().status, OrderStatus::Ready);
    }

    #[test]
    fn test_resync_merges_without_duplicates() {
        let mut book = OrderBook::new();
        book.apply(&OrderFeedEvent::update(order("order:a", "req-1", OrderStatus::Ready)));

        book.resync(vec![
            order("order:a", "req-1", OrderStatus::Preparing),
            order("order:b", "req-2", OrderStatus::Pending),
        ]);

        assert_eq!(book.len(), 2);
        // Resync carried an older snapshot; local state stays ahead
        assert_eq!(book.find("order:a").unwrap().status, OrderStatus::Ready);
    }

    #[test]
    fn test_resubmitting_same_request_does_not_duplicate_placeholder() {
        let mut book = OrderBook::new();
        book.submit_local(pending("req-1", 50));
        book.submit_local(pending("req-1", 60));
        assert_eq!(book.len(), 1);
        assert_eq!(book.find_pending("req-1").unwrap().submitted_at, 60);
    }

    #[test]
    fn test_display_order_pending_first_then_newest() {
        let mut book = OrderBook::new();
        let mut older = order("order:a", "req-1", OrderStatus::Pending);
        older.created_at = 100;
        let mut newer = order("order:b", "req-2", OrderStatus::Pending);
        newer.created_at = 200;

        book.apply(&OrderFeedEvent::insert(older));
        book.apply(&OrderFeedEvent::insert(newer));
        book.submit_local(pending("req-3", 300));

        match &book.entries()[0] {
            OrderEntry::Pending(p) => assert_eq!(p.request_id, "req-3"),
            other => panic!("expected pending head, got {other:?}"),
        }
        match &book.entries()[1] {
            OrderEntry::Confirmed(o) => assert_eq!(o.id, "order:b"),
            other => panic!("expected order:b, got {other:?}"),
        }
    }

    #[test]
    fn test_active_query_excludes_terminal_orders() {
        let mut book = OrderBook::new();
        book.apply(&OrderFeedEvent::insert(order("order:a", "req-1", OrderStatus::Ready)));
        book.apply(&OrderFeedEvent::insert(order("order:b", "req-2", OrderStatus::Completed)));
        book.apply(&OrderFeedEvent::insert(order("order:c", "req-3", OrderStatus::PaymentFailed)));

        let active: Vec<_> = book.active().map(|o| o.id.as_str()).collect();
        assert_eq!(active, vec!["order:a"]);
    }

    #[test]
    fn test_merge_orders_keeps_union_of_optional_fields() {
        let mut with_user = order("order:a", "req-1", OrderStatus::Pending);
        with_user.user_id = Some("user:1".to_string());
        let mut without_user = order("order:a", "req-1", OrderStatus::Preparing);
        without_user.user_id = None;

        let merged = merge_orders(&with_user, &without_user);
        assert_eq!(merged.status, OrderStatus::Preparing);
        assert_eq!(merged.user_id, Some("user:1".to_string()));

        let merged_flipped = merge_orders(&without_user, &with_user);
        assert_eq!(merged, merged_flipped);
    }
}
