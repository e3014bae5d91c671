use axum::{
    Extension, Form, Json,
    extract::{OriginalUri, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use crate::{
    AppState,
    error::{AppError, AppResult},
    i18n::Lang,
    middleware::{CurrentUser, Flash, FlashKind, FlashView, OptionalUser, flash_redirect},
    routes::activity::{Activity, actions},
    routes::group::Capability,
    utils::{ApiResponse, Page, into_api_response, page_number, success_to_api_response},
};

use super::model::{
    Article, ArticleForm, ArticleView, Comment, CommentForm, HOME_ARTICLE_COUNT,
    KNOWLEDGE_PAGE_SIZE, KnowledgeQuery, SEARCH_LIMIT, SearchQuery,
};

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub articles: Vec<ArticleView>,
    pub username: Option<String>,
    pub flash: Option<FlashView>,
}

#[derive(Debug, Serialize)]
pub struct KnowledgePage {
    pub title: String,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub articles: Page<ArticleView>,
    pub flash: Option<FlashView>,
}

#[derive(Debug, Serialize)]
pub struct ArticlePage {
    pub article: ArticleView,
    pub comments: Vec<Comment>,
    pub can_edit: bool,
    pub can_comment: bool,
    pub flash: Option<FlashView>,
}

#[derive(Debug, Serialize)]
pub struct ArticleFormPage {
    pub title: String,
    pub article: Option<ArticleView>,
}

#[derive(Debug, Serialize)]
pub struct ArticleListPage {
    pub articles: Vec<ArticleView>,
}

#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub title: String,
    pub query: String,
    pub results: Vec<ArticleView>,
}

/// 只有作者本人或管理员可以编辑、删除文章
fn can_edit(user: &CurrentUser, article: &Article) -> bool {
    article.author_id == user.id() || user.is_admin()
}

async fn load_article(state: &AppState, id: i64) -> AppResult<Article> {
    Article::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound)
}

fn views(articles: Vec<Article>) -> Vec<ArticleView> {
    articles.iter().map(Article::to_view).collect()
}

#[axum::debug_handler(state = AppState)]
pub async fn index(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    lang: Lang,
    flash: Flash,
) -> AppResult<Json<ApiResponse<HomePage>>> {
    let articles = Article::latest_published(&state.pool, HOME_ARTICLE_COUNT).await?;
    Ok(success_to_api_response(HomePage {
        articles: views(articles),
        username: current.map(|c| c.user.username),
        flash: flash.view(lang),
    }))
}

#[axum::debug_handler(state = AppState)]
pub async fn knowledge(
    State(state): State<AppState>,
    Query(query): Query<KnowledgeQuery>,
    lang: Lang,
    flash: Flash,
) -> AppResult<Json<ApiResponse<KnowledgePage>>> {
    let page = page_number(query.page);
    let articles = Article::list_published(
        &state.pool,
        query.category.as_deref(),
        query.tag.as_deref(),
        page,
        KNOWLEDGE_PAGE_SIZE,
    )
    .await?;

    Ok(success_to_api_response(KnowledgePage {
        title: lang.text("knowledge_base").to_string(),
        category: query.category,
        tag: query.tag,
        articles: articles.map(|a| a.to_view()),
        flash: flash.view(lang),
    }))
}

#[axum::debug_handler(state = AppState)]
pub async fn view_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    OptionalUser(current): OptionalUser,
    lang: Lang,
    flash: Flash,
) -> AppResult<Json<ApiResponse<ArticlePage>>> {
    if !Article::increment_views(&state.pool, id).await? {
        return Err(AppError::NotFound);
    }
    let article = load_article(&state, id).await?;
    let comments = Comment::for_article(&state.pool, id).await?;

    let (can_edit, can_comment) = match &current {
        Some(user) => (can_edit(user, &article), user.can(Capability::Comment)),
        None => (false, false),
    };

    Ok(success_to_api_response(ArticlePage {
        article: article.to_view(),
        comments,
        can_edit,
        can_comment,
        flash: flash.view(lang),
    }))
}

#[axum::debug_handler(state = AppState)]
pub async fn new_article_form(
    Extension(user): Extension<CurrentUser>,
    lang: Lang,
) -> AppResult<Json<ApiResponse<ArticleFormPage>>> {
    user.require(Capability::Post)?;
    Ok(success_to_api_response(ArticleFormPage {
        title: lang.text("new_article").to_string(),
        article: None,
    }))
}

#[axum::debug_handler(state = AppState)]
pub async fn create_article(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<ArticleForm>,
) -> AppResult<Response> {
    user.require(Capability::Post)?;

    let article = match Article::create(&state.pool, user.id(), &form).await {
        Ok(article) => article,
        Err(AppError::Validation(reason)) => {
            tracing::debug!("Rejected new article from {}: {}", user.id(), reason);
            return Ok(flash_redirect("/article/new", FlashKind::Error, "article_invalid"));
        }
        Err(e) => return Err(e),
    };
    Activity::record_quietly(
        &state.pool,
        user.id(),
        actions::ARTICLE_CREATED,
        Some(&article.title),
    )
    .await;

    Ok(flash_redirect(
        &format!("/article/{}", article.id),
        FlashKind::Success,
        "article_created",
    ))
}

#[axum::debug_handler(state = AppState)]
pub async fn edit_article_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    lang: Lang,
) -> AppResult<Json<ApiResponse<ArticleFormPage>>> {
    let article = load_article(&state, id).await?;
    if !can_edit(&user, &article) {
        return Err(AppError::Forbidden);
    }

    Ok(success_to_api_response(ArticleFormPage {
        title: lang.text("edit_article").to_string(),
        article: Some(article.to_view()),
    }))
}

/// `/article/{id}/edit` 与 `/edit_article/{id}` 共用此处理器，统一校验作者身份
#[axum::debug_handler(state = AppState)]
pub async fn update_article(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<ArticleForm>,
) -> AppResult<Response> {
    let article = load_article(&state, id).await?;
    if !can_edit(&user, &article) {
        tracing::info!("User {} denied editing article {}", user.id(), id);
        return Err(AppError::Forbidden);
    }

    // 校验失败时回到提交所用的编辑地址
    let updated = match Article::update(&state.pool, id, &form).await {
        Ok(updated) => updated,
        Err(AppError::Validation(reason)) => {
            tracing::debug!("Rejected edit of article {}: {}", id, reason);
            return Ok(flash_redirect(uri.path(), FlashKind::Error, "article_invalid"));
        }
        Err(e) => return Err(e),
    };
    Activity::record_quietly(
        &state.pool,
        user.id(),
        actions::ARTICLE_UPDATED,
        Some(&updated.title),
    )
    .await;

    Ok(flash_redirect(
        &format!("/article/{id}"),
        FlashKind::Success,
        "article_updated",
    ))
}

#[axum::debug_handler(state = AppState)]
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    user.require(Capability::Comment)?;
    load_article(&state, id).await?;

    let target = format!("/article/{id}");
    match Comment::create(&state.pool, id, user.id(), &form.content).await {
        Ok(_) => {
            Activity::record_quietly(&state.pool, user.id(), actions::COMMENT_CREATED, None).await;
            Ok(flash_redirect(&target, FlashKind::Success, "comment_created"))
        }
        Err(AppError::Validation(_)) => {
            Ok(flash_redirect(&target, FlashKind::Error, "empty_comment"))
        }
        Err(e) => Err(e),
    }
}

async fn delete_article_inner(state: &AppState, user: &CurrentUser, id: i64) -> AppResult<()> {
    let article = load_article(state, id).await?;
    if !can_edit(user, &article) {
        return Err(AppError::Forbidden);
    }
    Article::delete(&state.pool, id).await?;
    Activity::record_quietly(
        &state.pool,
        user.id(),
        actions::ARTICLE_DELETED,
        Some(&article.title),
    )
    .await;
    Ok(())
}

#[axum::debug_handler(state = AppState)]
pub async fn delete_article(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Json<ApiResponse<()>> {
    match delete_article_inner(&state, &user, id).await {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => into_api_response(Err(e)),
    }
}

#[axum::debug_handler(state = AppState)]
pub async fn list_articles(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ArticleListPage>>> {
    let articles = Article::list_all(&state.pool).await?;
    Ok(success_to_api_response(ArticleListPage {
        articles: views(articles),
    }))
}

#[axum::debug_handler(state = AppState)]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    lang: Lang,
) -> AppResult<Response> {
    let keyword = query.q.trim();
    if keyword.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }

    let results = Article::search(&state.pool, keyword, SEARCH_LIMIT).await?;
    Ok(success_to_api_response(SearchPage {
        title: lang.text("search_results").to_string(),
        query: keyword.to_string(),
        results: views(results),
    })
    .into_response())
}
