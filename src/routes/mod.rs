use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    middleware::{auth_middleware, flash_middleware, log_errors},
};

pub mod about;
pub mod activity;
pub mod admin;
pub mod article;
pub mod chat;
pub mod group;
pub mod site;
pub mod user;

/// 组装全部路由；限流中间件依赖 Redis，由 `main` 另行添加
pub fn app(state: AppState) -> Router {
    // 公开路由，登录与否都可访问
    let public_routes = Router::new()
        .route("/", get(article::index))
        .route("/login", get(user::login_page).post(user::login))
        .route("/register", post(user::register))
        .route("/knowledge", get(article::knowledge))
        .route("/article/{id}", get(article::view_article))
        .route("/about", get(about::about_page))
        .route("/search", get(article::search))
        .route("/change_language/{lang}", get(site::change_language));

    let protected_routes = Router::new()
        // 账户
        .route("/logout", get(user::logout))
        .route("/account", get(user::account))
        .route("/update_profile", post(user::update_profile))
        .route("/update_password", post(user::update_password))
        .route("/update_notifications", post(user::update_notifications))
        // 文章
        .route(
            "/article/new",
            get(article::new_article_form).post(article::create_article),
        )
        .route(
            "/article/{id}/edit",
            get(article::edit_article_form).post(article::update_article),
        )
        .route(
            "/edit_article/{id}",
            get(article::edit_article_form).post(article::update_article),
        )
        .route("/article/{id}/comment", post(article::create_comment))
        .route("/articles", get(article::list_articles))
        .route("/api/article/{id}", delete(article::delete_article))
        // 管理后台
        .route("/admin", get(admin::admin_index))
        .route("/admin/users", get(admin::admin_users))
        .route("/admin/articles", get(admin::admin_articles))
        .route(
            "/manage/about",
            get(about::manage_about).post(about::save_about),
        )
        .route("/api/about/save", post(about::save_about))
        // 智能问答
        .route("/chat", get(chat::chat_page))
        .route("/api/chat/config", post(chat::update_config))
        .route("/api/chat/conversations", get(chat::list_conversations))
        .route("/api/chat/conversation", post(chat::create_conversation))
        .route(
            "/api/chat/conversation/{id}",
            delete(chat::delete_conversation),
        )
        .route(
            "/api/chat/conversation/{id}/messages",
            get(chat::list_messages),
        )
        .route("/api/chat/message", post(chat::send_message))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", uploads)
        .layer(axum::middleware::from_fn(flash_middleware))
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
