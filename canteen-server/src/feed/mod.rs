//! 变更推送 - 订单事件总线
//!
//! # 架构
//!
//! ```text
//! OrderService ──▶ publish() ──▶ broadcast::Sender<OrderFeedEvent>
//!                                      │
//!                        ┌─────────────┼─────────────┐
//!                        ▼             ▼             ▼
//!                  FeedSubscription (按归属过滤: 食堂 / 用户)
//! ```
//!
//! 投递语义为 at-least-once 且可能乱序；事件携带完整订单快照，
//! 订阅端按 `order.id` 幂等合并。作用域过滤在服务端完成，
//! 订阅者永远看不到别家食堂或别人订单的事件。

mod hub;

pub use hub::{FeedHub, FeedLapse, FeedSubscription};
