//! LLM 类型定义

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 聊天消息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// 角色：system, user, assistant
    pub role: String,
    /// 消息内容
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// 聊天选项
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// 温度参数
    pub temperature: Option<f64>,
    /// 最大 token 数
    pub max_tokens: Option<u32>,
    /// 要求模型返回 JSON 对象
    pub json_output: bool,
}

/// 一次完整调用的结果
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// 模型输出文本
    pub content: String,
    /// 完成原因
    pub finish_reason: Option<String>,
    /// 实际使用的模型
    pub model: String,
}

/// 聊天模型抽象
///
/// 服务层只依赖这个 trait，HTTP 客户端和测试替身都实现它
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 发送一次非流式请求，返回完整输出
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<Completion, LlmError>;
}

/// LLM 错误类型
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP 请求错误
    #[error("HTTP 请求失败: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API 返回错误
    #[error("API 错误 ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// JSON 解析错误
    #[error("JSON 解析失败: {0}")]
    JsonError(#[from] serde_json::Error),

    /// 模型拒绝回答或被内容过滤
    #[error("模型拒绝生成: {0}")]
    Refused(String),

    /// 响应中没有任何内容
    #[error("模型返回了空响应")]
    EmptyResponse,
}

impl LlmError {
    /// 错误类别，用于请求日志
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::HttpError(e) if e.is_timeout() => "timeout",
            LlmError::HttpError(_) => "http",
            LlmError::ApiError { .. } => "api",
            LlmError::ConfigError(_) => "config",
            LlmError::JsonError(_) => "json",
            LlmError::Refused(_) => "refused",
            LlmError::EmptyResponse => "empty",
        }
    }

    /// HTTP 状态码（如果有）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LlmError::ApiError { status, .. } => Some(*status),
            LlmError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(LlmError::Refused("content_filter".to_string()).kind(), "refused");
        assert_eq!(LlmError::EmptyResponse.kind(), "empty");
        let err = LlmError::ApiError {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.kind(), "api");
        assert_eq!(err.status_code(), Some(429));
    }
}
