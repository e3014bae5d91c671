use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AboutSection {
    #[serde(skip_serializing)]
    pub id: i64,
    pub title: String,
    pub content: String,
    pub position: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionInput {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveAboutRequest {
    #[serde(default)]
    pub sections: Vec<SectionInput>,
}

/// 数据库中没有任何章节时展示的内容
pub fn default_sections() -> Vec<AboutSection> {
    [
        (
            "平台简介",
            "本平台致力于整理和分享中医药知识，为学习者和从业者提供可靠的参考资料。",
        ),
        (
            "我们的使命",
            "传承经典，服务大众。通过知识库、社区讨论与智能问答，让传统医学知识更易获取。",
        ),
        ("联系我们", "如有建议或合作意向，请通过管理员邮箱与我们联系。"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (title, content))| AboutSection {
        id: 0,
        title: title.to_string(),
        content: content.to_string(),
        position: i as i64,
    })
    .collect()
}

impl AboutSection {
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AboutSection>(
            "SELECT id, title, content, position FROM about_sections ORDER BY position, id",
        )
        .fetch_all(pool)
        .await
    }

    /// 存储的章节，为空时退回默认内容
    pub async fn list_or_default(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let sections = Self::list(pool).await?;
        if sections.is_empty() {
            Ok(default_sections())
        } else {
            Ok(sections)
        }
    }

    /// 用新的章节整体替换旧内容，位置按提交顺序从0开始编号
    pub async fn replace_all(pool: &SqlitePool, sections: &[SectionInput]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM about_sections")
            .execute(&mut *tx)
            .await?;

        for (position, section) in sections.iter().enumerate() {
            sqlx::query("INSERT INTO about_sections (title, content, position) VALUES (?, ?, ?)")
                .bind(&section.title)
                .bind(&section.content)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    fn input(title: &str) -> SectionInput {
        SectionInput {
            title: title.into(),
            content: format!("{title} body"),
        }
    }

    #[tokio::test]
    async fn empty_store_falls_back_to_defaults() {
        let pool = test_pool().await;
        let sections = AboutSection::list_or_default(&pool).await.unwrap();
        assert_eq!(sections.len(), default_sections().len());
    }

    #[tokio::test]
    async fn replace_all_renumbers_positions() {
        let pool = test_pool().await;
        AboutSection::replace_all(&pool, &[input("a"), input("b"), input("c")])
            .await
            .unwrap();
        AboutSection::replace_all(&pool, &[input("y"), input("x")]).await.unwrap();

        let sections = AboutSection::list(&pool).await.unwrap();
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["y", "x"]);
        assert_eq!(sections[0].position, 0);
        assert_eq!(sections[1].position, 1);
    }
}
