//! Persistent data models

pub mod canteen;
pub mod order;

pub use canteen::Canteen;
pub use order::{Order, OrderItem, PaymentMethod};
