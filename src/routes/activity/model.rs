use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// 活动记录的动作标签
pub mod actions {
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const REGISTER: &str = "register";
    pub const PROFILE_UPDATED: &str = "profile_updated";
    pub const PASSWORD_UPDATED: &str = "password_updated";
    pub const ARTICLE_CREATED: &str = "article_created";
    pub const ARTICLE_UPDATED: &str = "article_updated";
    pub const ARTICLE_DELETED: &str = "article_deleted";
    pub const COMMENT_CREATED: &str = "comment_created";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
}

impl Activity {
    pub async fn record(
        pool: &SqlitePool,
        user_id: i64,
        action: &str,
        details: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (user_id, action, timestamp, details)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, action, timestamp, details
            "#,
        )
        .bind(user_id)
        .bind(action)
        .bind(Utc::now())
        .bind(details)
        .fetch_one(pool)
        .await
    }

    /// 记录失败只写日志，不影响主流程
    pub async fn record_quietly(pool: &SqlitePool, user_id: i64, action: &str, details: Option<&str>) {
        if let Err(e) = Self::record(pool, user_id, action, details).await {
            tracing::error!("记录用户活动失败 ({} / {}): {:?}", user_id, action, e);
        }
    }

    pub async fn recent_for_user(
        pool: &SqlitePool,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, user_id, action, timestamp, details
            FROM activities
            WHERE user_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::routes::user::{NewUser, User};

    #[tokio::test]
    async fn recent_activities_are_newest_first_and_limited() {
        let pool = test_pool().await;
        let user = User::create(
            &pool,
            NewUser {
                username: "dave",
                email: "dave@example.com",
                password: "secret1",
                is_admin: false,
                group_id: None,
            },
            4,
        )
        .await
        .unwrap();

        Activity::record(&pool, user.id, actions::LOGIN, None).await.unwrap();
        Activity::record(&pool, user.id, actions::PROFILE_UPDATED, Some("bio"))
            .await
            .unwrap();
        Activity::record(&pool, user.id, actions::LOGOUT, None).await.unwrap();

        let recent = Activity::recent_for_user(&pool, user.id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, actions::LOGOUT);
        assert_eq!(recent[1].action, actions::PROFILE_UPDATED);
        assert_eq!(recent[1].details.as_deref(), Some("bio"));
    }
}
