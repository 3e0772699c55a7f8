//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use shared::models::Order;
use shared::order::{CreateOrderRequest, UpdateStatusRequest};

use crate::core::ServerState;
use crate::utils::time::{parse_date, today};
use crate::utils::{AppError, AppResult};

/// Place an order
///
/// Returns the persisted record including the assigned pickup token.
/// Retries carrying the same `request_id` return the original order.
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<Order>> {
    let order = state.orders().create_order(payload).await?;
    Ok(Json(order))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.orders().get_order(&id)?;
    Ok(Json(order))
}

/// Get order by the create request's idempotency key
///
/// Clients whose create call timed out resolve the real outcome here
/// instead of resubmitting under a fresh key.
pub async fn get_by_request(
    State(state): State<ServerState>,
    Path(request_id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state
        .orders()
        .find_by_request(&request_id)?
        .ok_or_else(|| AppError::not_found(format!("No order for request {request_id}")))?;
    Ok(Json(order))
}

/// Record a status transition
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Order>> {
    let order = state.orders().update_status(&id, payload.status)?;
    Ok(Json(order))
}

/// Query params for listing orders
///
/// Exactly one of `canteen_id` / `user_id` selects the scope. Dates are
/// inclusive `YYYY-MM-DD` in the business timezone; both default to today.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub canteen_id: Option<String>,
    pub user_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// List orders by canteen or by user over a date range
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let tz = state.orders().timezone();
    let from = match &query.from {
        Some(date) => parse_date(date)?,
        None => today(tz),
    };
    let to = match &query.to {
        Some(date) => parse_date(date)?,
        None => today(tz),
    };
    if from > to {
        return Err(AppError::validation(format!(
            "from {from} is after to {to}"
        )));
    }

    let orders = match (&query.canteen_id, &query.user_id) {
        (Some(canteen_id), None) => state.orders().list_canteen_range(canteen_id, from, to)?,
        (None, Some(user_id)) => state.orders().list_user_range(user_id, from, to)?,
        _ => {
            return Err(AppError::validation(
                "exactly one of canteen_id or user_id is required",
            ));
        }
    };
    Ok(Json(orders))
}
