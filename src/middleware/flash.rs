use std::convert::Infallible;

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{Request, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;

use crate::i18n::Lang;
use crate::utils::cookie;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// 上一个请求留下的提示，Cookie 中只保存 `kind.key`，不含需要转义的字符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct FlashView {
    pub kind: FlashKind,
    pub text: String,
}

impl FlashMessage {
    fn encode(kind: FlashKind, key: &str) -> String {
        match kind {
            FlashKind::Success => format!("success.{key}"),
            FlashKind::Error => format!("error.{key}"),
        }
    }

    fn decode(raw: &str) -> Option<Self> {
        let (kind, key) = raw.split_once('.')?;
        let kind = match kind {
            "success" => FlashKind::Success,
            "error" => FlashKind::Error,
            _ => return None,
        };
        let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        valid.then(|| FlashMessage {
            kind,
            key: key.to_string(),
        })
    }

    pub fn localize(&self, lang: Lang) -> FlashView {
        FlashView {
            kind: self.kind,
            text: lang.text(&self.key).to_string(),
        }
    }
}

/// 读取待显示的提示
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<FlashMessage>);

impl Flash {
    pub fn view(&self, lang: Lang) -> Option<FlashView> {
        self.0.as_ref().map(|msg| msg.localize(lang))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Flash>().cloned().unwrap_or_default())
    }
}

/// 设置提示并跳转
pub fn flash_redirect(to: &str, kind: FlashKind, key: &str) -> Response {
    flash_redirect_with(CookieJar::new(), to, kind, key)
}

/// 同 [`flash_redirect`]，并一起写出 `jar` 中已有的 Cookie 变更
pub fn flash_redirect_with(jar: CookieJar, to: &str, kind: FlashKind, key: &str) -> Response {
    let jar = jar.add(cookie::flash(&FlashMessage::encode(kind, key)));
    (jar, Redirect::to(to)).into_response()
}

/// 解析 flash Cookie；页面渲染（非跳转）后清除它
pub async fn flash_middleware(mut req: Request<Body>, next: Next) -> Response {
    let incoming = cookie::read(req.headers(), cookie::FLASH_COOKIE)
        .and_then(|raw| FlashMessage::decode(&raw));
    let had_flash = incoming.is_some();
    req.extensions_mut().insert(Flash(incoming));

    let response = next.run(req).await;

    let sets_flash = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v).ok())
        .any(|c| c.name() == cookie::FLASH_COOKIE);
    if had_flash && !response.status().is_redirection() && !sets_flash {
        let jar = CookieJar::new().add(cookie::removal(cookie::FLASH_COOKIE));
        return (jar, response).into_response();
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_known_kinds_only() {
        assert_eq!(
            FlashMessage::decode("success.login_success"),
            Some(FlashMessage {
                kind: FlashKind::Success,
                key: "login_success".into()
            })
        );
        assert_eq!(FlashMessage::decode("info.login_success"), None);
        assert_eq!(FlashMessage::decode("error."), None);
        assert_eq!(FlashMessage::decode("error.<script>"), None);
    }

    #[test]
    fn localize_uses_translation_table() {
        let msg = FlashMessage::decode("error.wrong_password").unwrap();
        assert_eq!(msg.localize(Lang::En).text, "Current password is incorrect");
    }

    #[test]
    fn flash_redirect_sets_cookie() {
        let res = flash_redirect("/account", FlashKind::Success, "profile_update_success");
        assert!(res.status().is_redirection());
        let set_cookie = res.headers()[SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("flash=success.profile_update_success"));
    }

    #[test]
    fn flash_redirect_with_keeps_other_cookies() {
        let jar = CookieJar::new().add(cookie::session("tok", 60));
        let res = flash_redirect_with(jar, "/", FlashKind::Success, "login_success");
        let names: Vec<String> = res
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| Cookie::parse(v.to_str().unwrap()).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"session".to_string()));
        assert!(names.contains(&"flash".to_string()));
    }
}
