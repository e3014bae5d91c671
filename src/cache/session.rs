use std::sync::Arc;

use redis::{AsyncCommands, Client as RedisClient};

/// 已注销会话的键前缀
const REVOKED_SESSION_PREFIX: &str = "session:revoked:";

pub fn revoked_session_key(session_id: &str) -> String {
    format!("{}{}", REVOKED_SESSION_PREFIX, session_id)
}

/// 会话缓存操作
pub struct SessionCacheOperations;

impl SessionCacheOperations {
    /// 注销会话，记录保留到令牌本身过期为止
    pub async fn revoke_session(
        redis: &Arc<RedisClient>,
        session_id: &str,
        ttl: u64,
    ) -> Result<(), redis::RedisError> {
        if ttl == 0 {
            return Ok(());
        }
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(revoked_session_key(session_id), 1, ttl).await?;
        tracing::debug!("Revoked session {} for {}s", session_id, ttl);
        Ok(())
    }

    pub async fn is_revoked(
        redis: &Arc<RedisClient>,
        session_id: &str,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let exists: bool = conn.exists(revoked_session_key(session_id)).await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_key_is_namespaced() {
        assert_eq!(revoked_session_key("abc"), "session:revoked:abc");
    }
}
