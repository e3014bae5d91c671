use std::sync::Arc;

use config::Config;
use redis::Client as RedisClient;
use routes::chat::ChatProvider;
use sqlx::SqlitePool;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod i18n;
pub mod middleware;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    /// 未配置时会话注销只清除 Cookie
    pub redis: Option<Arc<RedisClient>>,
    pub chat_provider: Arc<dyn ChatProvider>,
}
