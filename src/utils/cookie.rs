//! 会话、语言与一次性提示（flash）所用的 Cookie。

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration;

pub const SESSION_COOKIE: &str = "session";
pub const LANG_COOKIE: &str = "lang";
pub const FLASH_COOKIE: &str = "flash";

const LANG_MAX_AGE_DAYS: i64 = 365;
const FLASH_MAX_AGE_SECS: i64 = 300;

pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|c| c.value().to_string())
}

fn build(name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

pub fn session(token: &str, max_age_secs: u64) -> Cookie<'static> {
    let secs = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
    build(SESSION_COOKIE, token.to_string(), Duration::seconds(secs))
}

pub fn lang(code: &str) -> Cookie<'static> {
    build(LANG_COOKIE, code.to_string(), Duration::days(LANG_MAX_AGE_DAYS))
}

pub fn flash(value: &str) -> Cookie<'static> {
    build(FLASH_COOKIE, value.to_string(), Duration::seconds(FLASH_MAX_AGE_SECS))
}

/// 让浏览器删除同名 Cookie（空值、Max-Age=0）
pub fn removal(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").http_only(true).build();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::COOKIE};

    #[test]
    fn reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("lang=en; session=abc.def"));
        assert_eq!(read(&headers, LANG_COOKIE).as_deref(), Some("en"));
        assert_eq!(read(&headers, SESSION_COOKIE).as_deref(), Some("abc.def"));
        assert_eq!(read(&headers, FLASH_COOKIE), None);
    }

    #[test]
    fn session_cookie_is_http_only_for_whole_site() {
        let cookie = session("tok", 3600);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::hours(1)));
    }

    #[test]
    fn removal_sets_zero_max_age() {
        let cookie = removal(SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert!(cookie.to_string().contains("Max-Age=0"));
    }
}
