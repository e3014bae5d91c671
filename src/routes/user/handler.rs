use axum::{
    Extension, Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::{
    AppState,
    cache::SessionCacheOperations,
    error::{AppError, AppResult},
    i18n::Lang,
    middleware::{
        Capabilities, CurrentUser, Flash, FlashKind, FlashView, OptionalUser, flash_redirect,
        flash_redirect_with, safe_next,
    },
    routes::activity::{Activity, actions},
    routes::article::{Article, ArticleView},
    routes::group::{MEMBER_GROUP, UserGroup},
    utils::{
        ApiResponse, cookie, error_to_api_response, generate_session_token,
        success_to_api_response,
    },
};

use super::model::{
    LoginForm, MIN_PASSWORD_LEN, NewUser, NextQuery, RegisterForm, UpdateNotificationsForm,
    UpdatePasswordForm, UpdateProfileForm, User, is_valid_email, is_valid_username,
};

const ACCOUNT_ACTIVITY_COUNT: i64 = 10;

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub title: String,
    pub flash: Option<FlashView>,
}

#[derive(Debug, Serialize)]
pub struct AccountPage {
    pub title: String,
    pub user: User,
    pub group: Option<String>,
    pub capabilities: Capabilities,
    pub activities: Vec<Activity>,
    pub articles: Vec<ArticleView>,
    pub flash: Option<FlashView>,
}

#[axum::debug_handler(state = AppState)]
pub async fn login_page(
    OptionalUser(current): OptionalUser,
    lang: Lang,
    flash: Flash,
) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }
    success_to_api_response(LoginPage {
        title: lang.text("login").to_string(),
        flash: flash.view(lang),
    })
    .into_response()
}

#[axum::debug_handler(state = AppState)]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    lang: Lang,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let user = match User::find_by_username(&state.pool, form.username.trim()).await? {
        Some(user) if user.check_password(&form.password)? => user,
        _ => {
            tracing::info!("Failed login attempt for {}", form.username);
            return Ok(error_to_api_response::<()>(lang.text("login_failed")).into_response());
        }
    };

    let target = safe_next(query.next.as_deref()).to_string();
    let (token, _claims) = generate_session_token(user.id, &state.config)?;

    if let Err(e) = User::touch_last_login(&state.pool, user.id).await {
        tracing::error!("Failed to update last login for {}: {}", user.id, e);
    }
    Activity::record_quietly(&state.pool, user.id, actions::LOGIN, None).await;
    tracing::info!("User {} logged in", user.username);

    let jar = jar.add(cookie::session(
        &token,
        state.config.session_expiration().as_secs(),
    ));
    Ok(flash_redirect_with(jar, &target, FlashKind::Success, "login_success"))
}

/// 注销会话：Redis 中记录会话ID直到令牌过期，并清除 Cookie
#[axum::debug_handler(state = AppState)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    jar: CookieJar,
) -> Response {
    match &state.redis {
        Some(redis) => {
            let ttl = user.claims.remaining_secs() as u64;
            if let Err(e) = SessionCacheOperations::revoke_session(redis, &user.claims.sid, ttl).await {
                tracing::warn!("Failed to revoke session {}: {}", user.claims.sid, e);
            }
        }
        None => tracing::debug!("Redis not configured, session {} only cleared", user.claims.sid),
    }

    Activity::record_quietly(&state.pool, user.id(), actions::LOGOUT, None).await;

    let jar = jar.add(cookie::removal(cookie::SESSION_COOKIE));
    flash_redirect_with(jar, "/", FlashKind::Success, "logout_success")
}

#[axum::debug_handler(state = AppState)]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let username = form.username.trim();
    if !is_valid_username(username)
        || !is_valid_email(&form.email)
        || form.password.chars().count() < MIN_PASSWORD_LEN
    {
        return Ok(flash_redirect("/login", FlashKind::Error, "invalid_registration"));
    }

    let group = UserGroup::find_by_name(&state.pool, MEMBER_GROUP).await?;
    let created = User::create(
        &state.pool,
        NewUser {
            username,
            email: &form.email,
            password: &form.password,
            is_admin: false,
            group_id: group.map(|g| g.id),
        },
        state.config.bcrypt_cost,
    )
    .await;

    match created {
        Ok(user) => {
            Activity::record_quietly(&state.pool, user.id, actions::REGISTER, None).await;
            Ok(flash_redirect("/login", FlashKind::Success, "register_success"))
        }
        Err(AppError::Conflict(_)) => Ok(flash_redirect("/login", FlashKind::Error, "user_exists")),
        Err(e) => Err(e),
    }
}

#[axum::debug_handler(state = AppState)]
pub async fn account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    lang: Lang,
    flash: Flash,
) -> AppResult<Json<ApiResponse<AccountPage>>> {
    let activities =
        Activity::recent_for_user(&state.pool, current.id(), ACCOUNT_ACTIVITY_COUNT).await?;
    let articles = Article::by_author(&state.pool, current.id()).await?;

    Ok(success_to_api_response(AccountPage {
        title: lang.text("account_settings").to_string(),
        capabilities: current.capabilities(),
        group: current.group.as_ref().map(|g| g.name.clone()),
        user: current.user,
        activities,
        articles: articles.iter().map(Article::to_view).collect(),
        flash: flash.view(lang),
    }))
}

#[axum::debug_handler(state = AppState)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<UpdateProfileForm>,
) -> AppResult<Response> {
    if !is_valid_email(&form.email) {
        return Ok(flash_redirect("/account", FlashKind::Error, "invalid_email"));
    }

    let bio = form.bio.as_deref().map(str::trim);
    match User::update_profile(&state.pool, current.id(), &form.email, bio).await {
        Ok(()) => {
            Activity::record_quietly(&state.pool, current.id(), actions::PROFILE_UPDATED, None)
                .await;
            Ok(flash_redirect("/account", FlashKind::Success, "profile_update_success"))
        }
        Err(AppError::Conflict(_)) => Ok(flash_redirect("/account", FlashKind::Error, "email_taken")),
        Err(e) => Err(e),
    }
}

#[axum::debug_handler(state = AppState)]
pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<UpdatePasswordForm>,
) -> AppResult<Response> {
    if !current.user.check_password(&form.current_password)? {
        return Ok(flash_redirect("/account", FlashKind::Error, "wrong_password"));
    }
    if form.new_password != form.confirm_password {
        return Ok(flash_redirect("/account", FlashKind::Error, "password_mismatch"));
    }
    if form.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Ok(flash_redirect("/account", FlashKind::Error, "password_too_short"));
    }

    User::set_password(
        &state.pool,
        current.id(),
        &form.new_password,
        state.config.bcrypt_cost,
    )
    .await?;
    Activity::record_quietly(&state.pool, current.id(), actions::PASSWORD_UPDATED, None).await;
    tracing::info!("User {} changed password", current.id());

    Ok(flash_redirect("/account", FlashKind::Success, "password_update_success"))
}

/// 表单中出现 `emailNews` 即视为开启
#[axum::debug_handler(state = AppState)]
pub async fn update_notifications(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<UpdateNotificationsForm>,
) -> AppResult<Response> {
    User::update_notifications(&state.pool, current.id(), form.email_news.is_some()).await?;
    Ok(flash_redirect(
        "/account",
        FlashKind::Success,
        "notifications_update_success",
    ))
}
