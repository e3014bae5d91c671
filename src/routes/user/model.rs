use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::utils::{hash_password, verify_password};

const USER_COLUMNS: &str = "id, username, email, password_hash, bio, avatar, email_notifications, \
     is_admin, group_id, created_at, last_login";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub email_notifications: bool,
    pub is_admin: bool,
    pub group_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub is_admin: bool,
    pub group_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileForm {
    #[serde(default)]
    pub email: String,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordForm {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotificationsForm {
    #[serde(rename = "emailNews")]
    pub email_news: Option<String>,
}

pub const MIN_PASSWORD_LEN: usize = 6;

/// 用户名只允许字母、数字和下划线
pub fn is_valid_username(username: &str) -> bool {
    (2..=64).contains(&username.chars().count())
        && username.chars().all(|c| c.is_alphanumeric() || c == '_')
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && email.len() <= 120,
        None => false,
    }
}

impl User {
    pub async fn create(pool: &SqlitePool, new: NewUser<'_>, cost: u32) -> AppResult<Self> {
        let password_hash = hash_password(new.password, cost)?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, is_admin, group_id, email_notifications, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.email.trim())
        .bind(password_hash)
        .bind(new.is_admin)
        .bind(new.group_id)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("用户名或邮箱已存在".into()),
            other => other,
        })?;

        tracing::info!("Created user: {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub fn check_password(&self, password: &str) -> Result<bool, bcrypt::BcryptError> {
        verify_password(password, &self.password_hash)
    }

    pub async fn set_password(
        pool: &SqlitePool,
        id: i64,
        password: &str,
        cost: u32,
    ) -> AppResult<()> {
        let password_hash = hash_password(password, cost)?;
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn touch_last_login(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        id: i64,
        email: &str,
        bio: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET email = ?, bio = ? WHERE id = ?")
            .bind(email.trim())
            .bind(bio)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_notifications(
        pool: &SqlitePool,
        id: i64,
        enabled: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET email_notifications = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }
}
