use std::sync::Arc;

use crate::core::Config;
use crate::feed::FeedHub;
use crate::orders::{OrderService, OrderStorage};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | orders | Arc<OrderService> | 订单服务 (唯一写入口) |
/// | feed | FeedHub | 变更推送总线 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 订单服务
    pub orders: Arc<OrderService>,
    /// 变更推送总线
    pub feed: FeedHub,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/canteen.redb)
    /// 3. 推送总线与订单服务
    ///
    /// # Panics
    ///
    /// 工作目录或数据库初始化失败时 panic
    pub fn initialize(config: &Config) -> Self {
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        let db_path = config.database_dir().join("canteen.redb");
        let storage =
            OrderStorage::open(&db_path).expect("Failed to initialize order database");

        let feed = FeedHub::with_capacity(config.feed_channel_capacity);
        let orders = Arc::new(OrderService::new(
            storage,
            feed.clone(),
            config.timezone,
            config.token_alloc_retries,
        ));

        Self {
            config: config.clone(),
            orders,
            feed,
        }
    }

    /// 使用已构建的组件创建状态 (测试用)
    pub fn with_parts(config: Config, orders: Arc<OrderService>, feed: FeedHub) -> Self {
        Self {
            config,
            orders,
            feed,
        }
    }

    /// 获取订单服务
    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    /// 获取推送总线
    pub fn feed(&self) -> &FeedHub {
        &self.feed
    }
}
