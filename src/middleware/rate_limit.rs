use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::{config::Config, utils::error_to_api_response};

#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

/// 客户端IP：x-real-ip > x-forwarded-for 第一个非空值 > 连接地址
fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
                .map(str::to_string)
        })
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
        .trim()
        .to_string()
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: Config) -> Self {
        Self {
            redis,
            config: Arc::new(config),
        }
    }

    pub async fn check_rate_limit(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, StatusCode> {
        let remote = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        let ip = client_ip(req.headers(), remote);
        let key = format!("rate_limit:{}", ip);

        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                // Redis 不可用时放行请求
                tracing::warn!("Rate limiter unavailable: {}", e);
                return Ok(next.run(req).await);
            }
        };

        // 使用 Redis 的 INCR 和 EXPIRE 命令实现计数器
        let count: i64 = conn
            .incr(&key, 1)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        if count == 1 {
            let _: () = conn
                .expire(&key, self.config.rate_limit_window().as_secs() as i64)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }

        if count > i64::from(self.config.rate_limit_requests) {
            tracing::info!("Rate limit exceeded for {}", ip);
            return Ok((
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response::<()>(format!(
                    "请求过于频繁，请在{}秒后重试",
                    self.config.rate_limit_window().as_secs()
                )),
            )
                .into_response());
        }

        Ok(next.run(req).await)
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    limiter.check_rate_limit(req, next).await
}
