//! Feed API Module
//!
//! WebSocket subscription to the order change feed, scoped server-side to
//! one canteen or one user.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Feed router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/feed/ws", get(handler::subscribe))
}
