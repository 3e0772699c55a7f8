//! redb-based storage layer for orders and daily token counters
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order records (never deleted by app flow) |
//! | `token_counters` | `(canteen_id, token_date)` | `u64` | Last issued token per canteen per day |
//! | `processed_requests` | `request_id` | `order_id` | Idempotency map for create retries |
//! | `canteen_orders` | `(canteen_id, created_at, order_id)` | `()` | Date-range index |
//! | `user_orders` | `(user_id, created_at, order_id)` | `()` | Customer history index |
//! | `canteens` | `canteen_id` | `Canteen` | Canteen registry |
//!
//! # Atomicity
//!
//! The token read-increment and the order insert happen inside ONE write
//! transaction. A failed insert rolls the counter back with it, so token
//! sequences stay contiguous: no duplicates, no gaps under normal
//! operation. Status changes are a single read-modify-write transaction
//! per order, so two concurrent updates can never race past each other's
//! validity check.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate` by default; once `commit()`
//! returns, the token and the order are on disk together. Counters survive
//! restarts, which a process-wide in-memory counter would not.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use rust_decimal::Decimal;
use shared::models::{Canteen, Order, OrderItem, PaymentMethod};
use shared::order::{OrderStatus, TransitionOutcome};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for order records: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Table for daily token counters: key = (canteen_id, token_date YYYYMMDD),
/// value = last issued token number
const TOKEN_COUNTERS_TABLE: TableDefinition<(&str, u32), u64> =
    TableDefinition::new("token_counters");

/// Table for processed create requests: key = request_id, value = order_id
const PROCESSED_REQUESTS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("processed_requests");

/// Index for canteen date-range queries: key = (canteen_id, created_at, order_id)
const CANTEEN_ORDERS_TABLE: TableDefinition<(&str, i64, &str), ()> =
    TableDefinition::new("canteen_orders");

/// Index for customer history: key = (user_id, created_at, order_id)
const USER_ORDERS_TABLE: TableDefinition<(&str, i64, &str), ()> =
    TableDefinition::new("user_orders");

/// Table for canteen registry: key = canteen_id, value = JSON-serialized Canteen
const CANTEENS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("canteens");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Validated order draft handed to the allocator
///
/// Everything except `id` and `token_number`, which only exist once the
/// allocating transaction commits.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub request_id: String,
    pub canteen_id: String,
    pub user_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub estimated_minutes: u32,
    pub payment_method: PaymentMethod,
    pub token_date: u32,
    pub created_at: i64,
}

/// Outcome of an atomic insert
#[derive(Debug)]
pub enum InsertOutcome {
    /// A new order was persisted with a freshly allocated token
    Created(Order),
    /// The request id was already processed; the original order is returned
    /// and no token was consumed
    Replayed(Order),
}

/// Outcome of an atomic status update
#[derive(Debug)]
pub enum StatusUpdate {
    /// The transition was recorded
    Applied(Order),
    /// Target status already held; nothing was written
    NoOp(Order),
    /// The transition is not legal; nothing was written. Carries the
    /// current record so callers can report the rejected `from` state.
    Rejected(Order),
}

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl OrderStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Create all tables so later read transactions never hit a missing table
    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(TOKEN_COUNTERS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_REQUESTS_TABLE)?;
            let _ = write_txn.open_table(CANTEEN_ORDERS_TABLE)?;
            let _ = write_txn.open_table(USER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(CANTEENS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // ========== Order Creation (token allocation) ==========

    /// Atomically allocate the next token for `(canteen_id, token_date)`
    /// and persist the order under it
    ///
    /// The counter read, the increment, the order insert, the index inserts
    /// and the idempotency marker are one transaction. If the request id
    /// was already processed the transaction is aborted and the original
    /// order returned, so client retries never allocate a second token.
    pub fn insert_order_atomic(&self, draft: NewOrder) -> StorageResult<InsertOutcome> {
        let txn = self.db.begin_write()?;

        // Replay check inside the transaction: a concurrent retry that lost
        // the race observes the winner's marker here.
        let replayed_id = {
            let processed = txn.open_table(PROCESSED_REQUESTS_TABLE)?;
            processed
                .get(draft.request_id.as_str())?
                .map(|guard| guard.value().to_string())
        };
        if let Some(order_id) = replayed_id {
            let order = Self::load_order_txn(&txn, &order_id)?
                .ok_or(StorageError::OrderNotFound(order_id))?;
            txn.abort()?;
            return Ok(InsertOutcome::Replayed(order));
        }

        let order = {
            // Next token for this canteen's day. Counter and insert commit
            // together, so a failed insert rolls the number back with it.
            let mut counters = txn.open_table(TOKEN_COUNTERS_TABLE)?;
            let counter_key = (draft.canteen_id.as_str(), draft.token_date);
            let last = counters.get(counter_key)?.map(|g| g.value()).unwrap_or(0);
            let token_number = last + 1;
            counters.insert(counter_key, token_number)?;
            drop(counters);

            let order = Order {
                id: format!("order:{}", uuid::Uuid::new_v4()),
                canteen_id: draft.canteen_id,
                user_id: draft.user_id,
                request_id: draft.request_id,
                token_number,
                token_date: draft.token_date,
                items: draft.items,
                total: draft.total,
                estimated_minutes: draft.estimated_minutes,
                payment_method: draft.payment_method,
                status: OrderStatus::Pending,
                created_at: draft.created_at,
                completed_at: None,
            };

            let bytes = serde_json::to_vec(&order)?;
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            orders.insert(order.id.as_str(), bytes.as_slice())?;
            drop(orders);

            let mut by_canteen = txn.open_table(CANTEEN_ORDERS_TABLE)?;
            by_canteen.insert(
                (order.canteen_id.as_str(), order.created_at, order.id.as_str()),
                (),
            )?;
            drop(by_canteen);

            if let Some(user_id) = order.user_id.as_deref() {
                let mut by_user = txn.open_table(USER_ORDERS_TABLE)?;
                by_user.insert((user_id, order.created_at, order.id.as_str()), ())?;
            }

            let mut processed = txn.open_table(PROCESSED_REQUESTS_TABLE)?;
            processed.insert(order.request_id.as_str(), order.id.as_str())?;

            order
        };

        txn.commit()?;
        Ok(InsertOutcome::Created(order))
    }

    // ========== Status Updates ==========

    /// Atomically validate and record a status transition
    ///
    /// Read, validate, write, commit in one transaction per order. The
    /// `completed_at` stamp is written only on the transition into
    /// `Completed` and only if not already set.
    pub fn update_status_atomic(
        &self,
        order_id: &str,
        target: OrderStatus,
        now_millis: i64,
    ) -> StorageResult<StatusUpdate> {
        let txn = self.db.begin_write()?;

        let mut order = match Self::load_order_txn(&txn, order_id)? {
            Some(order) => order,
            None => {
                txn.abort()?;
                return Err(StorageError::OrderNotFound(order_id.to_string()));
            }
        };

        match order.status.apply(target) {
            Ok(TransitionOutcome::NoOp) => {
                txn.abort()?;
                Ok(StatusUpdate::NoOp(order))
            }
            Err(_) => {
                txn.abort()?;
                Ok(StatusUpdate::Rejected(order))
            }
            Ok(TransitionOutcome::Applied) => {
                order.status = target;
                if target == OrderStatus::Completed && order.completed_at.is_none() {
                    order.completed_at = Some(now_millis);
                }
                let bytes = serde_json::to_vec(&order)?;
                {
                    let mut orders = txn.open_table(ORDERS_TABLE)?;
                    orders.insert(order.id.as_str(), bytes.as_slice())?;
                }
                txn.commit()?;
                Ok(StatusUpdate::Applied(order))
            }
        }
    }

    // ========== Lookups ==========

    /// Get an order by id
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        orders
            .get(order_id)?
            .map(|guard| serde_json::from_slice(guard.value()).map_err(Into::into))
            .transpose()
    }

    /// Get the order a request id produced, if any
    pub fn find_by_request(&self, request_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let processed = read_txn.open_table(PROCESSED_REQUESTS_TABLE)?;
        let Some(order_id) = processed.get(request_id)?.map(|g| g.value().to_string()) else {
            return Ok(None);
        };
        drop(processed);
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        orders
            .get(order_id.as_str())?
            .map(|guard| serde_json::from_slice(guard.value()).map_err(Into::into))
            .transpose()
    }

    /// List a canteen's orders with `from <= created_at < to` (Unix millis),
    /// ascending by creation time
    pub fn list_by_canteen(
        &self,
        canteen_id: &str,
        from_millis: i64,
        to_millis: i64,
    ) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CANTEEN_ORDERS_TABLE)?;
        let mut ids = Vec::new();
        for entry in index.range((canteen_id, from_millis, "")..(canteen_id, to_millis, ""))? {
            let (key, _) = entry?;
            ids.push(key.value().2.to_string());
        }
        drop(index);
        Self::load_orders(&read_txn, &ids)
    }

    /// List a customer's orders with `from <= created_at < to` (Unix millis),
    /// ascending by creation time
    pub fn list_by_user(
        &self,
        user_id: &str,
        from_millis: i64,
        to_millis: i64,
    ) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USER_ORDERS_TABLE)?;
        let mut ids = Vec::new();
        for entry in index.range((user_id, from_millis, "")..(user_id, to_millis, ""))? {
            let (key, _) = entry?;
            ids.push(key.value().2.to_string());
        }
        drop(index);
        Self::load_orders(&read_txn, &ids)
    }

    // ========== Canteen Registry ==========

    /// Insert or replace a canteen record
    pub fn put_canteen(&self, canteen: &Canteen) -> StorageResult<()> {
        let bytes = serde_json::to_vec(canteen)?;
        let txn = self.db.begin_write()?;
        {
            let mut canteens = txn.open_table(CANTEENS_TABLE)?;
            canteens.insert(canteen.id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Get a canteen by id
    pub fn get_canteen(&self, canteen_id: &str) -> StorageResult<Option<Canteen>> {
        let read_txn = self.db.begin_read()?;
        let canteens = read_txn.open_table(CANTEENS_TABLE)?;
        canteens
            .get(canteen_id)?
            .map(|guard| serde_json::from_slice(guard.value()).map_err(Into::into))
            .transpose()
    }

    // ========== Internal helpers ==========

    fn load_order_txn(txn: &WriteTransaction, order_id: &str) -> StorageResult<Option<Order>> {
        let orders = txn.open_table(ORDERS_TABLE)?;
        orders
            .get(order_id)?
            .map(|guard| serde_json::from_slice(guard.value()).map_err(Into::into))
            .transpose()
    }

    fn load_orders(
        read_txn: &redb::ReadTransaction,
        ids: &[String],
    ) -> StorageResult<Vec<Order>> {
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(guard) = orders.get(id.as_str())? {
                result.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(request_id: &str, canteen_id: &str, token_date: u32) -> NewOrder {
        NewOrder {
            request_id: request_id.to_string(),
            canteen_id: canteen_id.to_string(),
            user_id: Some("user:1".to_string()),
            items: vec![OrderItem {
                name: "Veg Thali".to_string(),
                quantity: 1,
                price: Decimal::new(8000, 2),
            }],
            total: Decimal::new(8000, 2),
            estimated_minutes: 15,
            payment_method: PaymentMethod::Upi,
            token_date,
            created_at: 1_000,
        }
    }

    fn created(outcome: InsertOutcome) -> Order {
        match outcome {
            InsertOutcome::Created(order) => order,
            InsertOutcome::Replayed(order) => panic!("unexpected replay of {}", order.id),
        }
    }

    #[test]
    fn test_tokens_are_sequential_per_canteen_day() {
        let storage = OrderStorage::open_in_memory().unwrap();
        for expected in 1..=5u64 {
            let order = created(
                storage
                    .insert_order_atomic(draft(&format!("req-{expected}"), "c1", 20260805))
                    .unwrap(),
            );
            assert_eq!(order.token_number, expected);
        }
    }

    #[test]
    fn test_counters_are_independent_per_canteen() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let a = created(storage.insert_order_atomic(draft("r1", "c1", 20260805)).unwrap());
        let b = created(storage.insert_order_atomic(draft("r2", "c2", 20260805)).unwrap());
        assert_eq!(a.token_number, 1);
        assert_eq!(b.token_number, 1);
    }

    #[test]
    fn test_counter_resets_on_new_day() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let d1a = created(storage.insert_order_atomic(draft("r1", "c1", 20260805)).unwrap());
        let d1b = created(storage.insert_order_atomic(draft("r2", "c1", 20260805)).unwrap());
        let d2 = created(storage.insert_order_atomic(draft("r3", "c1", 20260806)).unwrap());
        assert_eq!(d1a.token_number, 1);
        assert_eq!(d1b.token_number, 2);
        assert_eq!(d2.token_number, 1);
    }

    #[test]
    fn test_replayed_request_returns_original_without_new_token() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let first = created(storage.insert_order_atomic(draft("r1", "c1", 20260805)).unwrap());

        let replay = storage.insert_order_atomic(draft("r1", "c1", 20260805)).unwrap();
        let replayed = match replay {
            InsertOutcome::Replayed(order) => order,
            InsertOutcome::Created(_) => panic!("replay allocated a new order"),
        };
        assert_eq!(replayed.id, first.id);
        assert_eq!(replayed.token_number, 1);

        // Counter untouched: the next fresh request still gets token 2
        let second = created(storage.insert_order_atomic(draft("r2", "c1", 20260805)).unwrap());
        assert_eq!(second.token_number, 2);
    }

    #[test]
    fn test_status_rmw_applies_and_stamps_completion_once() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order = created(storage.insert_order_atomic(draft("r1", "c1", 20260805)).unwrap());

        for status in [OrderStatus::Preparing, OrderStatus::Ready] {
            match storage.update_status_atomic(&order.id, status, 2_000).unwrap() {
                StatusUpdate::Applied(o) => assert_eq!(o.status, status),
                other => panic!("expected Applied, got {other:?}"),
            }
        }

        let completed = match storage
            .update_status_atomic(&order.id, OrderStatus::Completed, 3_000)
            .unwrap()
        {
            StatusUpdate::Applied(o) => o,
            other => panic!("expected Applied, got {other:?}"),
        };
        assert_eq!(completed.completed_at, Some(3_000));

        // Second completion is a no-op and the stamp does not move
        match storage
            .update_status_atomic(&order.id, OrderStatus::Completed, 9_000)
            .unwrap()
        {
            StatusUpdate::NoOp(o) => assert_eq!(o.completed_at, Some(3_000)),
            other => panic!("expected NoOp, got {other:?}"),
        }
    }

    #[test]
    fn test_status_rmw_rejects_illegal_transition_without_writing() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order = created(storage.insert_order_atomic(draft("r1", "c1", 20260805)).unwrap());

        match storage
            .update_status_atomic(&order.id, OrderStatus::Ready, 2_000)
            .unwrap()
        {
            StatusUpdate::Rejected(o) => assert_eq!(o.status, OrderStatus::Pending),
            other => panic!("expected Rejected, got {other:?}"),
        }

        // Nothing was recorded
        let stored = storage.get_order(&order.id).unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[test]
    fn test_unknown_order_id_errors() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let err = storage
            .update_status_atomic("order:missing", OrderStatus::Preparing, 0)
            .unwrap_err();
        assert!(matches!(err, StorageError::OrderNotFound(_)));
    }

    #[test]
    fn test_canteen_range_query_honours_bounds() {
        let storage = OrderStorage::open_in_memory().unwrap();
        for (req, at) in [("r1", 100), ("r2", 200), ("r3", 300)] {
            let mut d = draft(req, "c1", 20260805);
            d.created_at = at;
            storage.insert_order_atomic(d).unwrap();
        }
        let mut other = draft("r4", "c2", 20260805);
        other.created_at = 200;
        storage.insert_order_atomic(other).unwrap();

        let listed = storage.list_by_canteen("c1", 100, 300).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|o| o.canteen_id == "c1"));
        assert_eq!(listed[0].created_at, 100);
        assert_eq!(listed[1].created_at, 200);
    }

    #[test]
    fn test_user_history_query() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let mut d = draft("r1", "c1", 20260805);
        d.user_id = Some("user:a".to_string());
        storage.insert_order_atomic(d).unwrap();

        let mut d = draft("r2", "c2", 20260805);
        d.user_id = Some("user:b".to_string());
        storage.insert_order_atomic(d).unwrap();

        let listed = storage.list_by_user("user:a", 0, i64::MAX).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].canteen_id, "c1");
    }

    #[test]
    fn test_canteen_registry_roundtrip() {
        let storage = OrderStorage::open_in_memory().unwrap();
        assert!(storage.get_canteen("c1").unwrap().is_none());

        let mut canteen = Canteen::new("c1", "North Mess");
        storage.put_canteen(&canteen).unwrap();
        assert!(storage.get_canteen("c1").unwrap().unwrap().accepting_orders);

        canteen.accepting_orders = false;
        storage.put_canteen(&canteen).unwrap();
        assert!(!storage.get_canteen("c1").unwrap().unwrap().accepting_orders);
    }
}
