//! Order API Module
//!
//! Order placement, status transitions and history queries. All mutations
//! go through [`crate::orders::OrderService`].

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        // Place an order (idempotent by request_id) / list by scope
        .route("/api/orders", post(handler::create).get(handler::list))
        // Idempotency-key lookup (timeout reconciliation)
        .route(
            "/api/orders/by-request/{request_id}",
            get(handler::get_by_request),
        )
        // Order detail
        .route("/api/orders/{id}", get(handler::get_by_id))
        // Status transition (payment callback or staff action)
        .route("/api/orders/{id}/status", put(handler::update_status))
}
