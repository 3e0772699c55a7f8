//! Canteen API Module
//!
//! Registry management: upsert canteens and toggle order acceptance.

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

/// Canteen router
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/canteens", put(handler::upsert))
        .route("/api/canteens/{id}", get(handler::get_by_id))
        .route("/api/canteens/{id}/accepting", put(handler::set_accepting))
}
