//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 下单、状态流转、查询
//! - [`canteens`] - 食堂登记与开关接单
//! - [`feed`] - WebSocket 变更订阅

use axum::Router;

use crate::core::ServerState;

pub mod canteens;
pub mod feed;
pub mod health;
pub mod orders;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

/// Assemble the full API router
pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(canteens::router())
        .merge(feed::router())
}
