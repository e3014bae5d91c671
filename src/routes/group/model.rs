use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

pub const MEMBER_GROUP: &str = "member";
pub const VIP_GROUP: &str = "vip";
pub const RESTRICTED_GROUP: &str = "restricted";

/// 用户组能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Post,
    Comment,
    UseAi,
}

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::Post, Capability::Comment, Capability::UseAi];
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserGroup {
    pub id: i64,
    pub name: String,
    pub can_post: bool,
    pub can_comment: bool,
    pub can_use_ai: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 管理员拥有全部能力；否则取所属用户组的标志，没有用户组则一律为 false
pub fn resolve_capability(is_admin: bool, group: Option<&UserGroup>, capability: Capability) -> bool {
    is_admin || group.is_some_and(|g| g.allows(capability))
}

struct DefaultGroup {
    name: &'static str,
    can_post: bool,
    can_comment: bool,
    can_use_ai: bool,
    description: &'static str,
}

const DEFAULT_GROUPS: [DefaultGroup; 3] = [
    DefaultGroup {
        name: MEMBER_GROUP,
        can_post: true,
        can_comment: true,
        can_use_ai: false,
        description: "可以发帖和评论的普通用户",
    },
    DefaultGroup {
        name: VIP_GROUP,
        can_post: true,
        can_comment: true,
        can_use_ai: true,
        description: "可以使用所有功能的VIP用户",
    },
    DefaultGroup {
        name: RESTRICTED_GROUP,
        can_post: false,
        can_comment: true,
        can_use_ai: false,
        description: "只能评论的受限用户",
    },
];

/// 创建缺失的默认用户组，可重复执行
pub async fn ensure_default_groups(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for group in &DEFAULT_GROUPS {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_groups (name, can_post, can_comment, can_use_ai, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(group.name)
        .bind(group.can_post)
        .bind(group.can_comment)
        .bind(group.can_use_ai)
        .bind(group.description)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::info!("Created default user group: {}", group.name);
        }
    }
    Ok(())
}

impl UserGroup {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Post => self.can_post,
            Capability::Comment => self.can_comment,
            Capability::UseAi => self.can_use_ai,
        }
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserGroup>(
            r#"
            SELECT id, name, can_post, can_comment, can_use_ai, description, created_at
            FROM user_groups
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserGroup>(
            r#"
            SELECT id, name, can_post, can_comment, can_use_ai, description, created_at
            FROM user_groups
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    fn group(can_post: bool, can_comment: bool, can_use_ai: bool) -> UserGroup {
        UserGroup {
            id: 1,
            name: "g".into(),
            can_post,
            can_comment,
            can_use_ai,
            description: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn non_admin_without_group_has_no_capabilities() {
        for cap in Capability::ALL {
            assert!(!resolve_capability(false, None, cap));
        }
    }

    #[test]
    fn admin_has_every_capability_regardless_of_group() {
        let locked = group(false, false, false);
        for cap in Capability::ALL {
            assert!(resolve_capability(true, None, cap));
            assert!(resolve_capability(true, Some(&locked), cap));
        }
    }

    #[test]
    fn group_flags_decide_for_regular_users() {
        let g = group(false, true, false);
        assert!(!resolve_capability(false, Some(&g), Capability::Post));
        assert!(resolve_capability(false, Some(&g), Capability::Comment));
        assert!(!resolve_capability(false, Some(&g), Capability::UseAi));
    }

    #[tokio::test]
    async fn default_groups_are_created_once() {
        let pool = test_pool().await;
        ensure_default_groups(&pool).await.unwrap();
        ensure_default_groups(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_groups")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 3);

        let restricted = UserGroup::find_by_name(&pool, RESTRICTED_GROUP)
            .await
            .unwrap()
            .unwrap();
        assert!(!restricted.allows(Capability::Post));
        assert!(restricted.allows(Capability::Comment));

        let vip = UserGroup::find_by_name(&pool, VIP_GROUP).await.unwrap().unwrap();
        assert!(Capability::ALL.iter().all(|cap| vip.allows(*cap)));
    }
}
