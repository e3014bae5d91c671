use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::utils::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("未登录")]
    Unauthorized,
    #[error("没有权限执行此操作")]
    Forbidden,
    #[error("{0}")]
    Denied(String),
    #[error("资源不存在")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("数据库错误: {0}")]
    Database(sqlx::Error),
    #[error("密码处理失败: {0}")]
    Password(#[from] bcrypt::BcryptError),
    #[error("会话令牌错误: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(db.message().to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::Denied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Password(_) | AppError::Token(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self);
        }

        let body: Json<ApiResponse<()>> = Json(ApiResponse::error(self.to_string()));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::NotFound));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_message_is_displayed_verbatim() {
        let err = AppError::Validation("标题不能为空".into());
        assert_eq!(err.to_string(), "标题不能为空");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
