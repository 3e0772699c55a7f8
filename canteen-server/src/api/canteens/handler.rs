//! Canteen API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use shared::models::Canteen;

use crate::core::ServerState;
use crate::utils::AppResult;

/// Insert or replace a canteen
pub async fn upsert(
    State(state): State<ServerState>,
    Json(payload): Json<Canteen>,
) -> AppResult<Json<Canteen>> {
    let canteen = state.orders().upsert_canteen(payload)?;
    Ok(Json(canteen))
}

/// Get canteen by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Canteen>> {
    let canteen = state.orders().get_canteen(&id)?;
    Ok(Json(canteen))
}

/// Accepting-state request
#[derive(Debug, Deserialize)]
pub struct SetAcceptingRequest {
    pub accepting: bool,
}

/// Open or close a canteen for new orders
pub async fn set_accepting(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<SetAcceptingRequest>,
) -> AppResult<Json<Canteen>> {
    let canteen = state.orders().set_accepting(&id, payload.accepting)?;
    Ok(Json(canteen))
}
