use axum::{
    extract::Path,
    http::{HeaderMap, header::REFERER},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{i18n::Lang, utils::cookie};

/// 切换界面语言后回到来源页面；不支持的语言代码不修改 Cookie
pub async fn change_language(
    Path(code): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let target = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("/")
        .to_string();

    match Lang::parse(&code) {
        Some(lang) => (jar.add(cookie::lang(lang.code())), Redirect::to(&target)).into_response(),
        None => {
            tracing::debug!("Ignoring unsupported language {}", code);
            Redirect::to(&target).into_response()
        }
    }
}
