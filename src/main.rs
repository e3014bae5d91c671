use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tcm_backend::{
    AppState,
    config::Config,
    database,
    middleware::{RateLimiter, rate_limit},
    routes::{self, chat::PlaceholderProvider},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {e}"))?;

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 数据库连接、迁移与默认数据
    let pool = database::connect(&config.database_url).await?;
    database::bootstrap(&pool, &config).await?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Redis 可选，用于会话注销和限流
    let redis = match &config.redis_url {
        Some(url) => Some(Arc::new(redis::Client::open(url.as_str())?)),
        None => {
            tracing::warn!("REDIS_URL not set, rate limiting and session revocation disabled");
            None
        }
    };

    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis.clone(),
        chat_provider: Arc::new(PlaceholderProvider),
    };

    let router = routes::app(state);

    let router = match redis {
        Some(client) => {
            let rate_limiter = Arc::new(RateLimiter::new(client, config.clone()));
            router.layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit))
        }
        None => router,
    };

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
