//! OrderService - order placement and lifecycle
//!
//! # Create Flow
//!
//! ```text
//! create_order(req)
//!     ├─ 1. Validate input (no storage touched on bad input)
//!     ├─ 2. Fast idempotency check (request_id)
//!     ├─ 3. Canteen gate (exists + accepting)
//!     ├─ 4. Acquire per-(canteen, day) allocation lock
//!     ├─ 5. Allocate token + insert order in ONE transaction
//!     │      (bounded retry on storage conflicts)
//!     ├─ 6. Publish INSERT feed event
//!     └─ 7. Return persisted order
//! ```
//!
//! The allocation lock is keyed by `(canteen_id, token_date)`: callers for
//! the same canteen and day queue behind each other, callers for other
//! canteens or other days do not. Token order matches commit order, not
//! request-arrival order.

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use dashmap::DashMap;
use shared::models::{Canteen, Order};
use shared::order::{CreateOrderRequest, OrderFeedEvent, OrderStatus};
use tokio::sync::Mutex;

use super::error::{OrderError, OrderResult};
use super::storage::{InsertOutcome, NewOrder, OrderStorage, StatusUpdate};
use crate::feed::FeedHub;
use crate::utils::time;
use crate::utils::validation::validate_create_request;

/// Allocation lock map size warning threshold
///
/// Entries are keyed by day, so the map grows by one entry per canteen
/// per day; anything past this means pruning has fallen behind.
const ALLOC_LOCKS_PRUNE_THRESHOLD: usize = 1024;

/// OrderService - the only write path into order storage
pub struct OrderService {
    storage: OrderStorage,
    feed: FeedHub,
    /// 业务时区 (取号与日期查询共用)
    tz: Tz,
    /// Max attempts for the allocate-and-insert transaction
    alloc_retries: u32,
    /// Per-(canteen_id, token_date) allocation locks
    alloc_locks: DashMap<(String, u32), Arc<Mutex<()>>>,
}

impl OrderService {
    pub fn new(storage: OrderStorage, feed: FeedHub, tz: Tz, alloc_retries: u32) -> Self {
        Self {
            storage,
            feed,
            tz,
            alloc_retries: alloc_retries.max(1),
            alloc_locks: DashMap::new(),
        }
    }

    /// The feed hub this service publishes to
    pub fn feed(&self) -> &FeedHub {
        &self.feed
    }

    /// The business timezone used for token dates and day boundaries
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    // ========== Create ==========

    /// Place an order: allocate the day's next pickup token for the target
    /// canteen and persist the order atomically
    ///
    /// Replays of an already-processed `request_id` return the original
    /// order without consuming a token, so client retries after timeouts
    /// are safe.
    pub async fn create_order(&self, req: CreateOrderRequest) -> OrderResult<Order> {
        let canteen_id = validate_create_request(&req)?;

        // Fast replay path: retried request, order already persisted
        if let Some(existing) = self.storage.find_by_request(&req.request_id)? {
            tracing::info!(
                request_id = %req.request_id,
                order_id = %existing.id,
                "Replayed create request"
            );
            return Ok(existing);
        }

        let canteen = self
            .storage
            .get_canteen(&canteen_id)?
            .ok_or_else(|| OrderError::CanteenUnavailable(format!("Canteen {canteen_id} does not exist")))?;
        if !canteen.accepting_orders {
            return Err(OrderError::CanteenUnavailable(format!(
                "Canteen {canteen_id} is not accepting orders"
            )));
        }

        let token_date = time::current_token_date(self.tz);
        let draft = NewOrder {
            request_id: req.request_id,
            canteen_id: canteen_id.clone(),
            user_id: req.user_id,
            items: req.items,
            total: req.total,
            estimated_minutes: req.estimated_minutes,
            payment_method: req.payment_method,
            token_date,
            created_at: time::now_millis(),
        };

        // Serialize allocation per (canteen, day); other keys proceed freely
        let lock = self.allocation_lock(&canteen_id, token_date);
        let _guard = lock.lock().await;

        let order = self.insert_with_retry(draft)?;

        tracing::info!(
            order_id = %order.id,
            canteen_id = %order.canteen_id,
            token = order.token_number,
            "Order placed"
        );
        Ok(order)
    }

    /// Run the allocate-and-insert transaction, retrying storage conflicts
    /// a bounded number of times
    fn insert_with_retry(&self, draft: NewOrder) -> OrderResult<Order> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.storage.insert_order_atomic(draft.clone()) {
                Ok(InsertOutcome::Created(order)) => {
                    // Publish before returning so feed subscribers observe
                    // the order no later than the direct caller
                    self.feed.publish(OrderFeedEvent::insert(order.clone()));
                    return Ok(order);
                }
                // Lost the race to our own earlier attempt or a concurrent
                // retry; the original order stands
                Ok(InsertOutcome::Replayed(order)) => return Ok(order),
                Err(e) if attempt < self.alloc_retries => {
                    tracing::warn!(
                        canteen_id = %draft.canteen_id,
                        attempt,
                        error = %e,
                        "Token allocation conflict, retrying"
                    );
                }
                Err(e) => {
                    return Err(OrderError::TokenAllocation {
                        canteen_id: draft.canteen_id,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    fn allocation_lock(&self, canteen_id: &str, token_date: u32) -> Arc<Mutex<()>> {
        if self.alloc_locks.len() > ALLOC_LOCKS_PRUNE_THRESHOLD {
            // Locks for past days can never be contended again
            self.alloc_locks.retain(|(_, date), _| *date >= token_date);
        }
        self.alloc_locks
            .entry((canteen_id.to_string(), token_date))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ========== Status ==========

    /// Record a status transition
    ///
    /// Idempotent: re-applying the status that already holds succeeds
    /// without writing or emitting anything. Illegal transitions are
    /// rejected inside the same transaction that read the current state.
    pub fn update_status(&self, order_id: &str, target: OrderStatus) -> OrderResult<Order> {
        match self
            .storage
            .update_status_atomic(order_id, target, time::now_millis())?
        {
            StatusUpdate::Applied(order) => {
                tracing::info!(order_id = %order.id, status = ?order.status, "Order status updated");
                self.feed.publish(OrderFeedEvent::update(order.clone()));
                Ok(order)
            }
            StatusUpdate::NoOp(order) => Ok(order),
            StatusUpdate::Rejected(order) => Err(shared::order::InvalidTransition {
                from: order.status,
                to: target,
            }
            .into()),
        }
    }

    // ========== Queries ==========

    /// Get an order by id
    pub fn get_order(&self, order_id: &str) -> OrderResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| OrderError::NotFound(format!("Order {order_id} not found")))
    }

    /// Get the order a create request produced, if it reached the store
    ///
    /// This is the reconciliation point for clients whose create call
    /// timed out with an unknown outcome.
    pub fn find_by_request(&self, request_id: &str) -> OrderResult<Option<Order>> {
        Ok(self.storage.find_by_request(request_id)?)
    }

    /// List a canteen's orders for an inclusive date range, using the same
    /// business-timezone day boundaries as the token allocator
    pub fn list_canteen_range(
        &self,
        canteen_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> OrderResult<Vec<Order>> {
        let start = time::day_start_millis(from, self.tz);
        let end = time::day_end_millis(to, self.tz);
        Ok(self.storage.list_by_canteen(canteen_id, start, end)?)
    }

    /// List a customer's orders for an inclusive date range
    pub fn list_user_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> OrderResult<Vec<Order>> {
        let start = time::day_start_millis(from, self.tz);
        let end = time::day_end_millis(to, self.tz);
        Ok(self.storage.list_by_user(user_id, start, end)?)
    }

    // ========== Canteen Registry ==========

    /// Insert or replace a canteen
    pub fn upsert_canteen(&self, canteen: Canteen) -> OrderResult<Canteen> {
        self.storage.put_canteen(&canteen)?;
        Ok(canteen)
    }

    /// Open or close a canteen for new orders
    pub fn set_accepting(&self, canteen_id: &str, accepting: bool) -> OrderResult<Canteen> {
        let mut canteen = self
            .storage
            .get_canteen(canteen_id)?
            .ok_or_else(|| OrderError::NotFound(format!("Canteen {canteen_id} not found")))?;
        canteen.accepting_orders = accepting;
        self.storage.put_canteen(&canteen)?;
        tracing::info!(canteen_id = %canteen_id, accepting, "Canteen accepting state changed");
        Ok(canteen)
    }

    /// Get a canteen by id
    pub fn get_canteen(&self, canteen_id: &str) -> OrderResult<Canteen> {
        self.storage
            .get_canteen(canteen_id)?
            .ok_or_else(|| OrderError::NotFound(format!("Canteen {canteen_id} not found")))
    }
}
