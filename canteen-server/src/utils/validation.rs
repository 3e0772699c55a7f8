//! Input validation helpers
//!
//! Centralized limits and validation for order submission. Everything here
//! runs before any storage is touched, so bad input never costs a token or
//! a write transaction.

use rust_decimal::Decimal;
use shared::models::OrderItem;
use shared::order::CreateOrderRequest;

use crate::orders::OrderError;

// ── Limits ──────────────────────────────────────────────────────────

/// Dish names (menu snapshot strings)
pub const MAX_NAME_LEN: usize = 200;

/// Maximum lines per order
pub const MAX_ITEMS_PER_ORDER: usize = 50;

/// Maximum quantity per line
pub const MAX_ITEM_QUANTITY: u32 = 99;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), OrderError> {
    if value.trim().is_empty() {
        return Err(OrderError::Validation(format!(
            "{field} must not be empty"
        )));
    }
    if value.len() > max_len {
        return Err(OrderError::Validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate a single order line.
pub fn validate_item(item: &OrderItem, index: usize) -> Result<(), OrderError> {
    validate_required_text(&item.name, &format!("items[{index}].name"), MAX_NAME_LEN)?;
    if item.quantity == 0 {
        return Err(OrderError::Validation(format!(
            "items[{index}]: quantity must be at least 1"
        )));
    }
    if item.quantity > MAX_ITEM_QUANTITY {
        return Err(OrderError::Validation(format!(
            "items[{index}]: quantity {} exceeds max {MAX_ITEM_QUANTITY}",
            item.quantity
        )));
    }
    if item.price < Decimal::ZERO {
        return Err(OrderError::Validation(format!(
            "items[{index}]: price must not be negative"
        )));
    }
    Ok(())
}

/// Validate a create-order request. Returns the canteen id on success.
pub fn validate_create_request(req: &CreateOrderRequest) -> Result<String, OrderError> {
    validate_required_text(&req.request_id, "request_id", MAX_NAME_LEN)?;

    let canteen_id = req
        .canteen_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| OrderError::Validation("canteen_id is required".to_string()))?;

    if req.items.is_empty() {
        return Err(OrderError::Validation(
            "items must not be empty".to_string(),
        ));
    }
    if req.items.len() > MAX_ITEMS_PER_ORDER {
        return Err(OrderError::Validation(format!(
            "too many items ({}, max {MAX_ITEMS_PER_ORDER})",
            req.items.len()
        )));
    }
    for (index, item) in req.items.iter().enumerate() {
        validate_item(item, index)?;
    }
    if req.total < Decimal::ZERO {
        return Err(OrderError::Validation(
            "total must not be negative".to_string(),
        ));
    }

    Ok(canteen_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, quantity: u32) -> OrderItem {
        OrderItem {
            name: name.to_string(),
            quantity,
            price: Decimal::new(4500, 2),
        }
    }

    fn request() -> CreateOrderRequest {
        CreateOrderRequest::new("canteen:north", vec![item("Masala Dosa", 1)], Decimal::new(4500, 2))
    }

    #[test]
    fn test_valid_request_passes() {
        assert_eq!(
            validate_create_request(&request()).unwrap(),
            "canteen:north"
        );
    }

    #[test]
    fn test_missing_canteen_rejected() {
        let mut req = request();
        req.canteen_id = None;
        assert!(validate_create_request(&req).is_err());

        let mut req = request();
        req.canteen_id = Some("   ".to_string());
        assert!(validate_create_request(&req).is_err());
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut req = request();
        req.items.clear();
        assert!(validate_create_request(&req).is_err());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut req = request();
        req.items = vec![item("Masala Dosa", 0)];
        assert!(validate_create_request(&req).is_err());
    }

    #[test]
    fn test_negative_total_rejected() {
        let mut req = request();
        req.total = Decimal::new(-100, 2);
        assert!(validate_create_request(&req).is_err());
    }
}
