use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::utils::{Page, lenient_page, page_offset};

pub const KNOWLEDGE_PAGE_SIZE: i64 = 10;
pub const HOME_ARTICLE_COUNT: i64 = 5;
pub const SEARCH_LIMIT: i64 = 50;

const ARTICLE_SELECT: &str = r#"
    SELECT a.id, a.title, a.content, a.summary, a.category, a.tags, a.views,
           a.created_at, a.updated_at, a.published, a.author_id, u.username AS author
    FROM articles a
    JOIN users u ON u.id = a.author_id
"#;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published: bool,
    pub author_id: i64,
    pub author: String,
}

/// 对外输出的文章结构，标签拆分为列表
#[derive(Debug, Serialize)]
pub struct ArticleView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub views: i64,
    pub created_at: String,
    pub updated_at: String,
    pub published: bool,
    pub author_id: i64,
    pub author: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub article_id: i64,
    pub author: String,
}

/// 发布与编辑共用的表单
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleForm {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub category: String,
    pub tags: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct KnowledgeQuery {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// 拆分逗号分隔的标签，去掉空白与空项
pub fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

pub fn normalize_tags(raw: &str) -> String {
    split_tags(Some(raw)).join(",")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ArticleForm {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("标题不能为空".into()));
        }
        if self.content.trim().is_empty() {
            return Err(AppError::Validation("内容不能为空".into()));
        }
        if self.title.chars().count() > 200 {
            return Err(AppError::Validation("标题不能超过200个字符".into()));
        }
        Ok(())
    }
}

impl Article {
    pub fn to_view(&self) -> ArticleView {
        ArticleView {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            summary: self.summary.clone(),
            category: self.category.clone(),
            tags: split_tags(self.tags.as_deref()),
            views: self.views,
            created_at: self.created_at.format(TIME_FORMAT).to_string(),
            updated_at: self.updated_at.format(TIME_FORMAT).to_string(),
            published: self.published,
            author_id: self.author_id,
            author: self.author.clone(),
        }
    }

    pub async fn create(pool: &SqlitePool, author_id: i64, form: &ArticleForm) -> AppResult<Self> {
        form.validate()?;
        let now = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO articles (title, content, summary, category, tags, views, created_at, updated_at, published, author_id)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, 1, ?)
            RETURNING id
            "#,
        )
        .bind(form.title.trim())
        .bind(&form.content)
        .bind(form.summary.trim())
        .bind(form.category.trim())
        .bind(normalize_tags(&form.tags))
        .bind(now)
        .bind(now)
        .bind(author_id)
        .fetch_one(pool)
        .await?;

        tracing::info!("User {} created article {}", author_id, id);
        Self::find_by_id(pool, id).await?.ok_or(AppError::NotFound)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!("{ARTICLE_SELECT} WHERE a.id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// 更新内容并刷新 updated_at
    pub async fn update(pool: &SqlitePool, id: i64, form: &ArticleForm) -> AppResult<Self> {
        form.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE articles
            SET title = ?, content = ?, summary = ?, category = ?, tags = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(form.title.trim())
        .bind(&form.content)
        .bind(form.summary.trim())
        .bind(form.category.trim())
        .bind(normalize_tags(&form.tags))
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Self::find_by_id(pool, id).await?.ok_or(AppError::NotFound)
    }

    /// 每次阅读都计数，不去重
    pub async fn increment_views(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE articles SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 删除文章，评论由外键级联删除
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 知识库列表：仅已发布，分类精确匹配，标签子串匹配，最新在前
    pub async fn list_published(
        pool: &SqlitePool,
        category: Option<&str>,
        tag: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> Result<Page<Self>, sqlx::Error> {
        let category = non_blank(category);
        let tag = non_blank(tag);
        let filter = r#"
            WHERE a.published = 1
              AND (?1 IS NULL OR a.category = ?1)
              AND (?2 IS NULL OR instr(COALESCE(a.tags, ''), ?2) > 0)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM articles a {filter}"))
            .bind(category)
            .bind(tag)
            .fetch_one(pool)
            .await?;

        let items = sqlx::query_as::<_, Article>(&format!(
            "{ARTICLE_SELECT} {filter} ORDER BY a.created_at DESC, a.id DESC LIMIT ?3 OFFSET ?4"
        ))
        .bind(category)
        .bind(tag)
        .bind(per_page)
        .bind(page_offset(page, per_page))
        .fetch_all(pool)
        .await?;

        Ok(Page::new(items, page, per_page, total))
    }

    pub async fn latest_published(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "{ARTICLE_SELECT} WHERE a.published = 1 ORDER BY a.created_at DESC, a.id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "{ARTICLE_SELECT} ORDER BY a.created_at DESC, a.id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// 管理后台分页，包含未发布文章
    pub async fn list_page(
        pool: &SqlitePool,
        page: i64,
        per_page: i64,
    ) -> Result<Page<Self>, sqlx::Error> {
        let total = Self::count(pool).await?;
        let items = sqlx::query_as::<_, Article>(&format!(
            "{ARTICLE_SELECT} ORDER BY a.id LIMIT ? OFFSET ?"
        ))
        .bind(per_page)
        .bind(page_offset(page, per_page))
        .fetch_all(pool)
        .await?;
        Ok(Page::new(items, page, per_page, total))
    }

    pub async fn by_author(pool: &SqlitePool, author_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "{ARTICLE_SELECT} WHERE a.author_id = ? ORDER BY a.created_at DESC, a.id DESC"
        ))
        .bind(author_id)
        .fetch_all(pool)
        .await
    }

    /// 在标题、摘要、正文和标签中查找关键字
    pub async fn search(pool: &SqlitePool, keyword: &str, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            r#"{ARTICLE_SELECT}
            WHERE a.published = 1
              AND (instr(a.title, ?1) > 0
                   OR instr(COALESCE(a.summary, ''), ?1) > 0
                   OR instr(a.content, ?1) > 0
                   OR instr(COALESCE(a.tags, ''), ?1) > 0)
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT ?2"#
        ))
        .bind(keyword)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(pool)
            .await
    }
}

impl Comment {
    pub async fn create(
        pool: &SqlitePool,
        article_id: i64,
        author_id: i64,
        content: &str,
    ) -> AppResult<i64> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("评论内容不能为空".into()));
        }

        let id = sqlx::query_scalar(
            r#"
            INSERT INTO comments (content, created_at, author_id, article_id)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(content)
        .bind(Utc::now())
        .bind(author_id)
        .bind(article_id)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    pub async fn for_article(pool: &SqlitePool, article_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.content, c.created_at, c.author_id, c.article_id, u.username AS author
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.article_id = ?
            ORDER BY c.created_at, c.id
            "#,
        )
        .bind(article_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_article(pool: &SqlitePool, article_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE article_id = ?")
            .bind(article_id)
            .fetch_one(pool)
            .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::routes::user::{NewUser, User};

    async fn author(pool: &SqlitePool, name: &str) -> User {
        let email = format!("{name}@example.com");
        User::create(
            pool,
            NewUser {
                username: name,
                email: &email,
                password: "secret1",
                is_admin: false,
                group_id: None,
            },
            4,
        )
        .await
        .unwrap()
    }

    fn form(title: &str, category: &str, tags: &str) -> ArticleForm {
        ArticleForm {
            title: title.into(),
            content: "C".into(),
            summary: "S".into(),
            category: category.into(),
            tags: tags.into(),
        }
    }

    #[test]
    fn tags_are_split_and_trimmed() {
        assert_eq!(split_tags(Some("a,b")), vec!["a", "b"]);
        assert_eq!(split_tags(Some(" a , ,b ")), vec!["a", "b"]);
        assert!(split_tags(Some("")).is_empty());
        assert!(split_tags(None).is_empty());
        assert_eq!(normalize_tags(" x, y ,,"), "x,y");
    }

    #[test]
    fn blank_title_is_rejected() {
        let f = form("  ", "cat", "a");
        assert!(matches!(f.validate(), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn created_article_reads_back_with_tag_list() {
        let pool = test_pool().await;
        let user = author(&pool, "writer").await;

        let article = Article::create(&pool, user.id, &form("T", "cat", "a,b")).await.unwrap();
        let loaded = Article::find_by_id(&pool, article.id).await.unwrap().unwrap();
        let view = loaded.to_view();

        assert_eq!(view.title, "T");
        assert_eq!(view.content, "C");
        assert_eq!(view.summary.as_deref(), Some("S"));
        assert_eq!(view.category.as_deref(), Some("cat"));
        assert_eq!(view.tags, vec!["a", "b"]);
        assert_eq!(view.views, 0);
        assert!(view.published);
        assert_eq!(view.author, "writer");
    }

    #[tokio::test]
    async fn update_refreshes_updated_at() {
        let pool = test_pool().await;
        let user = author(&pool, "editor").await;
        let article = Article::create(&pool, user.id, &form("Old", "cat", "a")).await.unwrap();

        let updated = Article::update(&pool, article.id, &form("New", "dog", "z"))
            .await
            .unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.category.as_deref(), Some("dog"));
        assert!(updated.updated_at >= article.updated_at);
        assert_eq!(updated.created_at, article.created_at);

        let missing = Article::update(&pool, 9999, &form("X", "c", "t")).await;
        assert!(matches!(missing, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn deleting_article_removes_its_comments() {
        let pool = test_pool().await;
        let user = author(&pool, "commenter").await;
        let article = Article::create(&pool, user.id, &form("T", "cat", "a")).await.unwrap();
        let other = Article::create(&pool, user.id, &form("U", "cat", "a")).await.unwrap();

        Comment::create(&pool, article.id, user.id, "first").await.unwrap();
        Comment::create(&pool, article.id, user.id, "second").await.unwrap();
        Comment::create(&pool, other.id, user.id, "elsewhere").await.unwrap();
        assert_eq!(Comment::count_for_article(&pool, article.id).await.unwrap(), 2);

        assert!(Article::delete(&pool, article.id).await.unwrap());
        assert_eq!(Comment::count_for_article(&pool, article.id).await.unwrap(), 0);
        assert_eq!(Comment::count_for_article(&pool, other.id).await.unwrap(), 1);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn each_view_increments_counter() {
        let pool = test_pool().await;
        let user = author(&pool, "reader").await;
        let article = Article::create(&pool, user.id, &form("T", "cat", "a")).await.unwrap();

        assert!(Article::increment_views(&pool, article.id).await.unwrap());
        assert!(Article::increment_views(&pool, article.id).await.unwrap());
        assert!(!Article::increment_views(&pool, 4242).await.unwrap());

        let loaded = Article::find_by_id(&pool, article.id).await.unwrap().unwrap();
        assert_eq!(loaded.views, 2);
    }

    #[tokio::test]
    async fn listing_paginates_and_filters() {
        let pool = test_pool().await;
        let user = author(&pool, "prolific").await;
        for i in 0..25 {
            let category = if i % 5 == 0 { "herbs" } else { "theory" };
            let tags = if i % 2 == 0 { "yin,yang" } else { "qi" };
            Article::create(&pool, user.id, &form(&format!("A{i}"), category, tags))
                .await
                .unwrap();
        }

        let first = Article::list_published(&pool, None, None, 1, 10).await.unwrap();
        assert_eq!(first.total, 25);
        assert_eq!(first.pages, 3);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].title, "A24");

        let third = Article::list_published(&pool, None, None, 3, 10).await.unwrap();
        assert_eq!(third.items.len(), 5);
        assert_eq!(third.items[4].title, "A0");

        let beyond = Article::list_published(&pool, None, None, 4, 10).await.unwrap();
        assert!(beyond.items.is_empty());

        let herbs = Article::list_published(&pool, Some("herbs"), None, 1, 10).await.unwrap();
        assert_eq!(herbs.total, 5);

        let yang = Article::list_published(&pool, None, Some("yan"), 1, 10).await.unwrap();
        assert_eq!(yang.total, 13);

        let blank = Article::list_published(&pool, Some(""), Some(" "), 1, 10).await.unwrap();
        assert_eq!(blank.total, 25);
    }

    #[tokio::test]
    async fn unpublished_articles_are_hidden_from_listing_and_search() {
        let pool = test_pool().await;
        let user = author(&pool, "drafter").await;
        let draft = Article::create(&pool, user.id, &form("Hidden draft", "cat", "a")).await.unwrap();
        Article::create(&pool, user.id, &form("Visible piece", "cat", "a")).await.unwrap();
        sqlx::query("UPDATE articles SET published = 0 WHERE id = ?")
            .bind(draft.id)
            .execute(&pool)
            .await
            .unwrap();

        let page = Article::list_published(&pool, None, None, 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(Article::search(&pool, "draft", 10).await.unwrap().is_empty());
        assert_eq!(Article::search(&pool, "Visible", 10).await.unwrap().len(), 1);
        assert_eq!(Article::list_all(&pool).await.unwrap().len(), 2);
    }
}
