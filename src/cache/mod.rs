// 缓存模块
// Redis 中的会话注销记录

pub mod session;

pub use session::SessionCacheOperations;
