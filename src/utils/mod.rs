use axum::Json;
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub mod cookie;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    pub sid: String, // 会话ID，用于注销
    pub exp: i64,    // 过期时间
    pub iat: i64,    // 签发时间
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    /// 距离过期的剩余秒数
    pub fn remaining_secs(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

pub fn generate_session_token(
    user_id: i64,
    config: &Config,
) -> Result<(String, Claims), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = now + Duration::seconds(config.session_expiration().as_secs() as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        sid: Uuid::new_v4().to_string(),
        exp: expiration.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )?;

    tracing::debug!("Issued session {} for user {}", claims.sid, user_id);
    Ok((token, claims))
}

pub fn verify_session_token(
    token: &str,
    config: &Config,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.session_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// 统一的 JSON 响应结构：`{success, message?, ...payload}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            data: None,
        }
    }
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

pub fn error_to_api_response<T>(message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse::error(message))
}

/// JSON 接口不使用 HTTP 错误码，所有失败都折叠为 `success: false`
pub fn into_api_response<T: Serialize>(result: AppResult<T>) -> Json<ApiResponse<T>> {
    match result {
        Ok(data) => success_to_api_response(data),
        Err(err) => {
            if let AppError::Database(_) | AppError::Io(_) = err {
                tracing::error!("API request failed: {:?}", err);
            }
            error_to_api_response(err.to_string())
        }
    }
}

/// 分页结果
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, per_page: i64, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            items,
            page,
            per_page,
            total,
            pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages: self.pages,
        }
    }
}

/// 页码从1开始，缺省或小于1的页码按第1页处理
pub fn page_number(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// 分页查询的 OFFSET，超大页码不会溢出
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    page.saturating_sub(1).max(0).saturating_mul(per_page)
}

/// 查询参数中的页码：无法解析为整数时视为未提供
pub fn lenient_page<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hashed = hash_password("s3cret!", 4).unwrap();
        assert_ne!(hashed, "s3cret!");
        assert!(verify_password("s3cret!", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn session_token_round_trip() {
        let config = Config::for_tests();
        let (token, claims) = generate_session_token(42, &config).unwrap();
        let decoded = verify_session_token(&token, &config).unwrap();
        assert_eq!(decoded.user_id(), Some(42));
        assert_eq!(decoded.sid, claims.sid);
        assert!(decoded.remaining_secs() > 0);
    }

    #[test]
    fn session_token_rejects_other_secret() {
        let config = Config::for_tests();
        let (token, _) = generate_session_token(1, &config).unwrap();
        let other = Config {
            session_secret: "another-secret".into(),
            ..Config::for_tests()
        };
        assert!(verify_session_token(&token, &other).is_err());
    }

    #[test]
    fn page_counts_round_up() {
        let page = Page::new(vec![1, 2, 3, 4, 5], 3, 10, 25);
        assert_eq!(page.pages, 3);
        assert_eq!(Page::<i32>::new(vec![], 1, 10, 0).pages, 0);
        assert_eq!(Page::<i32>::new(vec![], 1, 10, 20).pages, 2);
    }

    #[test]
    fn page_number_clamps_to_first_page() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some(0)), 1);
        assert_eq!(page_number(Some(-4)), 1);
        assert_eq!(page_number(Some(3)), 3);
    }

    #[test]
    fn page_offset_saturates_for_huge_pages() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(i64::MAX, 10), i64::MAX);
        assert_eq!(page_offset(i64::MIN, 10), 0);
    }

    #[test]
    fn unparsable_page_is_treated_as_missing() {
        #[derive(Deserialize)]
        struct Query {
            #[serde(default, deserialize_with = "lenient_page")]
            page: Option<i64>,
        }
        let parse = |raw: &str| serde_json::from_str::<Query>(raw).unwrap().page;
        assert_eq!(parse(r#"{"page": "abc"}"#), None);
        assert_eq!(parse(r#"{"page": " 4 "}"#), Some(4));
        assert_eq!(parse(r#"{"page": "99999999999999999999"}"#), None);
        assert_eq!(parse("{}"), None);
    }

    #[test]
    fn envelope_flattens_payload() {
        #[derive(Serialize)]
        struct Payload {
            id: i64,
        }
        let value = serde_json::to_value(ApiResponse::success(Payload { id: 7 })).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "id": 7}));

        let value = serde_json::to_value(ApiResponse::<()>::error("boom")).unwrap();
        assert_eq!(value, serde_json::json!({"success": false, "message": "boom"}));
    }
}
