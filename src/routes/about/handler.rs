use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    AppState,
    error::{AppError, AppResult},
    i18n::Lang,
    middleware::{CurrentUser, FlashKind, flash_redirect},
    utils::{ApiResponse, error_to_api_response, into_api_response, success_to_api_response},
};

use super::model::{AboutSection, SaveAboutRequest};

#[derive(Debug, Serialize)]
pub struct AboutPage {
    pub title: String,
    pub about_content: Vec<AboutSection>,
}

#[derive(Debug, Serialize)]
pub struct Saved {}

#[axum::debug_handler(state = AppState)]
pub async fn about_page(
    State(state): State<AppState>,
    lang: Lang,
) -> AppResult<Json<ApiResponse<AboutPage>>> {
    let sections = AboutSection::list_or_default(&state.pool).await?;
    Ok(success_to_api_response(AboutPage {
        title: lang.text("about_us").to_string(),
        about_content: sections,
    }))
}

/// 非管理员提示无权限并返回首页
#[axum::debug_handler(state = AppState)]
pub async fn manage_about(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    lang: Lang,
) -> AppResult<Response> {
    if !user.is_admin() {
        return Ok(flash_redirect("/", FlashKind::Error, "permission_denied"));
    }

    let sections = AboutSection::list_or_default(&state.pool).await?;
    Ok(success_to_api_response(AboutPage {
        title: lang.text("about_us").to_string(),
        about_content: sections,
    })
    .into_response())
}

#[axum::debug_handler(state = AppState)]
pub async fn save_about(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    lang: Lang,
    Json(req): Json<SaveAboutRequest>,
) -> Json<ApiResponse<Saved>> {
    if !user.is_admin() {
        return error_to_api_response(lang.text("permission_denied"));
    }

    let result = AboutSection::replace_all(&state.pool, &req.sections)
        .await
        .map(|_| {
            tracing::info!("User {} saved {} about sections", user.id(), req.sections.len());
            Saved {}
        })
        .map_err(AppError::from);
    into_api_response(result)
}
