//! 统一错误处理模块
//!
//! 定义应用级错误类型，并实现 axum 的 IntoResponse trait 以便自动转换为 HTTP 响应。

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::SuggestionError;

/// 生成失败时返回给前端的统一提示
pub const GENERATION_FAILED_MESSAGE: &str = "Falha ao gerar sugestão. Por favor, tente novamente.";

/// 应用错误枚举
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 请求参数错误
    #[error("请求错误: {0}")]
    BadRequest(String),

    /// 输入内容不满足最低要求
    #[error("校验失败: {0}")]
    Validation(String),

    /// 模型生成失败
    #[error("生成失败")]
    Generation,
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(_) => "validation",
            AppError::Generation => "generation",
        }
    }
}

impl From<SuggestionError> for AppError {
    fn from(err: SuggestionError) -> Self {
        match err {
            SuggestionError::Validation(e) => AppError::Validation(e.to_string()),
            // 上游细节只进日志，不返回给调用方
            SuggestionError::Generation(_) => AppError::Generation,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Generation => (StatusCode::BAD_GATEWAY, GENERATION_FAILED_MESSAGE.to_string()),
        };

        let body = Json(json!({
            "success": false,
            "kind": self.kind(),
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// 便捷类型别名
pub type AppResult<T> = Result<T, AppError>;
