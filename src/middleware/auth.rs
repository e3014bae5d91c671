use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde::Serialize;

use crate::{
    AppState,
    cache::SessionCacheOperations,
    error::{AppError, AppResult},
    routes::group::{Capability, UserGroup, resolve_capability},
    routes::user::User,
    utils::{Claims, cookie, error_to_api_response, verify_session_token},
};

/// 当前请求的登录用户，由 [`auth_middleware`] 放入请求扩展
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub group: Option<UserGroup>,
    pub claims: Claims,
}

#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub can_post: bool,
    pub can_comment: bool,
    pub can_use_ai: bool,
}

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }

    pub fn can(&self, capability: Capability) -> bool {
        resolve_capability(self.user.is_admin, self.group.as_ref(), capability)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_post: self.can(Capability::Post),
            can_comment: self.can(Capability::Comment),
            can_use_ai: self.can(Capability::UseAi),
        }
    }

    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// 会话令牌优先从 Cookie 读取，其次是 `Authorization: Bearer`
fn session_token(headers: &HeaderMap) -> Option<String> {
    cookie::read(headers, cookie::SESSION_COOKIE)
        .filter(|token| !token.is_empty())
        .or_else(|| {
            headers
                .typed_get::<Authorization<Bearer>>()
                .map(|auth| auth.token().to_string())
        })
}

/// 解析会话令牌并加载用户；令牌无效、已注销或用户不存在时返回 `None`
pub async fn resolve_session(state: &AppState, headers: &HeaderMap) -> AppResult<Option<CurrentUser>> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };

    let claims = match verify_session_token(&token, &state.config) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Rejected session token: {}", e);
            return Ok(None);
        }
    };

    if let Some(redis) = &state.redis {
        match SessionCacheOperations::is_revoked(redis, &claims.sid).await {
            Ok(true) => return Ok(None),
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to check session revocation: {}", e),
        }
    }

    let Some(user_id) = claims.user_id() else {
        return Ok(None);
    };
    let Some(user) = User::find_by_id(&state.pool, user_id).await? else {
        return Ok(None);
    };
    let group = match user.group_id {
        Some(group_id) => UserGroup::find_by_id(&state.pool, group_id).await?,
        None => None,
    };

    Ok(Some(CurrentUser {
        user,
        group,
        claims,
    }))
}

/// 未登录时跳转到登录页并带上原始路径；`/api/` 下返回 401
fn unauthenticated(req: &Request<Body>) -> Response {
    let path = req.uri().path();
    if path.starts_with("/api/") {
        return (
            StatusCode::UNAUTHORIZED,
            error_to_api_response::<()>(AppError::Unauthorized.to_string()),
        )
            .into_response();
    }

    let original = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(path);
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", original)
        .finish();
    Redirect::to(&format!("/login?{query}")).into_response()
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match resolve_session(&state, req.headers()).await {
        Ok(Some(current)) => {
            req.extensions_mut().insert(current);
            next.run(req).await
        }
        Ok(None) => unauthenticated(&req),
        Err(e) => e.into_response(),
    }
}

/// 公开页面使用的可选登录用户
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(OptionalUser(Some(current.clone())));
        }
        Ok(OptionalUser(resolve_session(state, &parts.headers).await?))
    }
}

/// 只允许站内相对路径作为登录后的跳转目标，且不能含控制字符
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => "/",
    }
}
