use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::AppResult,
    i18n::Lang,
    middleware::CurrentUser,
    routes::article::{Article, ArticleView, Comment},
    routes::user::User,
    utils::{
        ApiResponse, Page, lenient_page, page_number, page_offset, success_to_api_response,
    },
};

pub const ADMIN_PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub title: String,
    pub user_count: i64,
    pub article_count: i64,
    pub comment_count: i64,
}

#[derive(Debug, Serialize)]
pub struct UsersPage {
    pub title: String,
    pub users: Page<User>,
}

#[derive(Debug, Serialize)]
pub struct ArticlesPage {
    pub title: String,
    pub articles: Page<ArticleView>,
}

#[axum::debug_handler(state = AppState)]
pub async fn admin_index(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    lang: Lang,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    user.require_admin()?;

    Ok(success_to_api_response(Dashboard {
        title: lang.text("admin_panel").to_string(),
        user_count: User::count(&state.pool).await?,
        article_count: Article::count(&state.pool).await?,
        comment_count: Comment::count(&state.pool).await?,
    }))
}

#[axum::debug_handler(state = AppState)]
pub async fn admin_users(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
    lang: Lang,
) -> AppResult<Json<ApiResponse<UsersPage>>> {
    user.require_admin()?;

    let page = page_number(query.page);
    let total = User::count(&state.pool).await?;
    let offset = page_offset(page, ADMIN_PAGE_SIZE);
    let users = User::list(&state.pool, ADMIN_PAGE_SIZE, offset).await?;

    Ok(success_to_api_response(UsersPage {
        title: lang.text("user_management").to_string(),
        users: Page::new(users, page, ADMIN_PAGE_SIZE, total),
    }))
}

#[axum::debug_handler(state = AppState)]
pub async fn admin_articles(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
    lang: Lang,
) -> AppResult<Json<ApiResponse<ArticlesPage>>> {
    user.require_admin()?;

    let articles = Article::list_page(&state.pool, page_number(query.page), ADMIN_PAGE_SIZE).await?;
    Ok(success_to_api_response(ArticlesPage {
        title: lang.text("article_management").to_string(),
        articles: articles.map(|a| a.to_view()),
    }))
}
