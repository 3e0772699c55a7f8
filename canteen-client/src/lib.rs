//! Client library for the campus canteen ordering platform
//!
//! Two halves:
//!
//! - [`CanteenApi`]: HTTP client for order submission and status updates.
//!   A create call that times out reports [`CreateOutcome::Unknown`], not
//!   failure; the caller reconciles by idempotency key.
//! - [`OrderBook`]: pure local state that merges optimistic entries,
//!   direct responses and change-feed events into one consistent view,
//!   commutatively and idempotently.

pub mod config;
pub mod error;
pub mod http;
pub mod reconcile;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{CanteenApi, CreateOutcome};
pub use reconcile::{OrderBook, OrderEntry, PendingOrder, merge_orders};
