//! Shared types for the campus canteen ordering platform
//!
//! Domain records, the order status state machine, change-feed events and
//! request DTOs used by both the server and client crates.

pub mod models;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Order re-exports (for convenient access)
pub use models::{Canteen, Order, OrderItem, PaymentMethod};
pub use order::{FeedEventKind, FeedScope, OrderFeedEvent, OrderStatus};
