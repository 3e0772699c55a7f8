//! Canteen Server - 校园订餐平台后端
//!
//! # 架构概述
//!
//! 本模块是订餐后端的主入口，提供以下核心功能：
//!
//! - **订单子系统** (`orders`): 每日取号、状态机、事务存储
//! - **变更推送** (`feed`): 按食堂/用户归属过滤的实时事件流
//! - **HTTP API** (`api`): RESTful API + WebSocket 订阅
//!
//! # 模块结构
//!
//! ```text
//! canteen-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 取号、状态机、存储
//! ├── feed/          # 变更推送总线
//! └── utils/         # 错误、日志、时间、校验
//! ```

pub mod api;
pub mod core;
pub mod feed;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use crate::feed::{FeedHub, FeedSubscription};
pub use crate::orders::{OrderService, OrderStorage};
pub use crate::utils::{AppError, AppResult};

// Re-export logger functions
pub use crate::utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let log_level = std::env::var("LOG_LEVEL").ok();
    init_logger_with_file(log_level.as_deref(), None);
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   ______            __
  / ____/___ _____  / /____  ___  ____
 / /   / __ `/ __ \/ __/ _ \/ _ \/ __ \
/ /___/ /_/ / / / / /_/  __/  __/ / / /
\____/\__,_/_/ /_/\__/\___/\___/_/ /_/
    "#
    );
}
