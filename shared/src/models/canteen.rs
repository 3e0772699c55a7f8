//! Canteen registry record

use serde::{Deserialize, Serialize};

/// Canteen - an order-accepting outlet on campus
///
/// Each canteen owns an independent daily token sequence. Closing a
/// canteen (`accepting_orders = false`) rejects new orders without
/// touching orders already placed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Canteen {
    /// Canteen ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Whether new orders are currently accepted
    #[serde(default = "default_accepting")]
    pub accepting_orders: bool,
}

fn default_accepting() -> bool {
    true
}

impl Canteen {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            accepting_orders: true,
        }
    }
}
