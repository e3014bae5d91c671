// 数据库连接、迁移与初始数据

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::config::Config;
use crate::routes::group::{VIP_GROUP, UserGroup, ensure_default_groups};
use crate::routes::user::{NewUser, User};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// 内存数据库只能使用单个连接，否则每个连接各自拥有一份空库
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// 创建默认用户组和管理员账号，已存在则跳过
pub async fn bootstrap(pool: &SqlitePool, config: &Config) -> Result<(), crate::error::AppError> {
    ensure_default_groups(pool).await?;

    if User::find_by_username(pool, &config.admin_username).await?.is_some() {
        tracing::debug!("Admin user {} already exists", config.admin_username);
        return Ok(());
    }

    let vip = UserGroup::find_by_name(pool, VIP_GROUP).await?;
    let admin = User::create(
        pool,
        NewUser {
            username: &config.admin_username,
            email: &config.admin_email,
            password: &config.admin_password,
            is_admin: true,
            group_id: vip.map(|g| g.id),
        },
        config.bcrypt_cost,
    )
    .await?;

    tracing::info!("Created admin user: {}", admin.username);
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    connect_in_memory().await.expect("in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let pool = test_pool().await;
        let config = Config::for_tests();
        bootstrap(&pool, &config).await.unwrap();
        bootstrap(&pool, &config).await.unwrap();

        let admin = User::find_by_username(&pool, "admin").await.unwrap().unwrap();
        assert!(admin.is_admin);
        assert!(admin.check_password("admin123").unwrap());

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
    }
}
