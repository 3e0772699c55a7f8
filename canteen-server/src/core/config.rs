use std::path::PathBuf;

use chrono_tz::Tz;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/canteen | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | CANTEEN_TZ | Asia/Kolkata | 业务时区 (取号与日界) |
/// | TOKEN_ALLOC_RETRIES | 3 | 取号事务最大尝试次数 |
/// | FEED_CHANNEL_CAPACITY | 1024 | 推送通道容量 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/canteen HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 业务时区：取号在该时区的午夜重置，日期范围查询共用同一边界
    pub timezone: Tz,
    /// 取号事务最大尝试次数
    pub token_alloc_retries: u32,
    /// 推送通道容量
    pub feed_channel_capacity: usize,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/canteen".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            timezone: parse_timezone(std::env::var("CANTEEN_TZ").ok().as_deref()),
            token_alloc_retries: std::env::var("TOKEN_ALLOC_RETRIES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3),
            feed_channel_capacity: std::env::var("FEED_CHANNEL_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1024),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 日志目录 (work_dir/logs)
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// 解析业务时区，无效值回退到 Asia/Kolkata 并告警
fn parse_timezone(value: Option<&str>) -> Tz {
    match value {
        None => chrono_tz::Asia::Kolkata,
        Some(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!(
                timezone = %name,
                "Invalid CANTEEN_TZ, falling back to Asia/Kolkata"
            );
            chrono_tz::Asia::Kolkata
        }),
    }
}
