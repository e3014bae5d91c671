use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

#[derive(Debug, Clone, FromRow)]
pub struct ChatConfig {
    pub id: i64,
    pub user_id: i64,
    pub api_type: String,
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
    pub model_list: String,
    pub updated_at: DateTime<Utc>,
}

/// 返回给页面的配置，不包含密钥本身
#[derive(Debug, Serialize)]
pub struct ChatConfigView {
    pub api_type: String,
    pub api_endpoint: String,
    pub model: String,
    pub model_list: Vec<String>,
    pub has_api_key: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatConfigRequest {
    pub api_type: Option<String>,
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub model: Option<String>,
    pub model_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Conversation {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: Option<i64>,
    pub content: Option<String>,
}

impl ChatConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn model_list(&self) -> Vec<String> {
        serde_json::from_str(&self.model_list).unwrap_or_default()
    }

    pub fn to_view(&self) -> ChatConfigView {
        ChatConfigView {
            api_type: self.api_type.clone(),
            api_endpoint: self.api_endpoint.clone(),
            model: self.model.clone(),
            model_list: self.model_list(),
            has_api_key: self.has_api_key(),
        }
    }

    pub async fn find_for_user(pool: &SqlitePool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatConfig>(
            r#"
            SELECT id, user_id, api_type, api_key, api_endpoint, model, model_list, updated_at
            FROM chat_configs
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 每个用户只有一份配置，缺省字段使用默认值
    pub async fn upsert(
        pool: &SqlitePool,
        user_id: i64,
        req: ChatConfigRequest,
    ) -> Result<Self, sqlx::Error> {
        let model_list = serde_json::to_string(&req.model_list.unwrap_or_default())
            .unwrap_or_else(|_| "[]".to_string());

        sqlx::query_as::<_, ChatConfig>(
            r#"
            INSERT INTO chat_configs (user_id, api_type, api_key, api_endpoint, model, model_list, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                api_type = excluded.api_type,
                api_key = excluded.api_key,
                api_endpoint = excluded.api_endpoint,
                model = excluded.model,
                model_list = excluded.model_list,
                updated_at = excluded.updated_at
            RETURNING id, user_id, api_type, api_key, api_endpoint, model, model_list, updated_at
            "#,
        )
        .bind(user_id)
        .bind(req.api_type.unwrap_or_else(|| "openai".to_string()))
        .bind(req.api_key.unwrap_or_default())
        .bind(req.api_endpoint.unwrap_or_default())
        .bind(req.model.unwrap_or_default())
        .bind(model_list)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }
}

impl Conversation {
    pub async fn create(pool: &SqlitePool, user_id: i64, title: &str) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO chat_conversations (user_id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, title, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, user_id, title, created_at, updated_at FROM chat_conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// 最近更新的对话在前
    pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM chat_conversations
            WHERE user_id = ?
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// 删除对话及其消息
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM chat_conversations WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// 在同一事务中保存用户消息与回复，并刷新对话时间
    pub async fn append_exchange(
        pool: &SqlitePool,
        id: i64,
        user_content: &str,
        reply: &str,
    ) -> Result<ChatMessage, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO chat_messages (conversation_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(ROLE_USER)
        .bind(user_content)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let assistant = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (conversation_id, role, content, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, conversation_id, role, content, created_at
            "#,
        )
        .bind(id)
        .bind(ROLE_ASSISTANT)
        .bind(reply)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chat_conversations SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(assistant)
    }
}

impl ChatMessage {
    pub async fn list_for_conversation(
        pool: &SqlitePool,
        conversation_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM chat_messages
            WHERE conversation_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await
    }

    /// 尚未保存的用户输入，用于交给回复提供方
    pub fn pending_user(conversation_id: i64, content: &str) -> Self {
        ChatMessage {
            id: 0,
            conversation_id,
            role: ROLE_USER.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::routes::user::{NewUser, User};

    async fn user(pool: &SqlitePool) -> User {
        User::create(
            pool,
            NewUser {
                username: "chatter",
                email: "chatter@example.com",
                password: "secret1",
                is_admin: false,
                group_id: None,
            },
            4,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn config_upsert_keeps_one_row_per_user() {
        let pool = test_pool().await;
        let u = user(&pool).await;

        let first = ChatConfig::upsert(&pool, u.id, ChatConfigRequest::default()).await.unwrap();
        assert_eq!(first.api_type, "openai");
        assert!(!first.has_api_key());
        assert!(first.model_list().is_empty());

        let second = ChatConfig::upsert(
            &pool,
            u.id,
            ChatConfigRequest {
                api_key: Some("sk-test".into()),
                model: Some("m1".into()),
                model_list: Some(vec!["m1".into(), "m2".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.has_api_key());
        assert_eq!(second.to_view().model_list, vec!["m1", "m2"]);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_configs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn exchange_is_stored_and_conversation_deleted_with_messages() {
        let pool = test_pool().await;
        let u = user(&pool).await;
        let conv = Conversation::create(&pool, u.id, "t").await.unwrap();

        let reply = Conversation::append_exchange(&pool, conv.id, "hello", "hi there")
            .await
            .unwrap();
        assert_eq!(reply.role, ROLE_ASSISTANT);

        let messages = ChatMessage::list_for_conversation(&pool, conv.id).await.unwrap();
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec![ROLE_USER, ROLE_ASSISTANT]);

        let touched = Conversation::find_by_id(&pool, conv.id).await.unwrap().unwrap();
        assert!(touched.updated_at >= conv.updated_at);

        Conversation::delete(&pool, conv.id).await.unwrap();
        assert!(ChatMessage::list_for_conversation(&pool, conv.id).await.unwrap().is_empty());
        assert!(Conversation::find_by_id(&pool, conv.id).await.unwrap().is_none());
    }
}
