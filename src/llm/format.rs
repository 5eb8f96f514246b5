//! API 格式检测、端点构建与错误体解析

use serde::{Deserialize, Serialize};

/// API 格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiFormat {
    /// OpenAI Chat Completions API
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
}

impl ApiFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiFormat::OpenAi => "openai",
            ApiFormat::Anthropic => "anthropic",
        }
    }
}

/// 根据模型名称检测 API 格式
///
/// 模型名包含 "claude" 则使用 Anthropic 格式，否则使用 OpenAI 格式
pub fn detect_api_format(model: &str) -> ApiFormat {
    if model.to_lowercase().contains("claude") {
        ApiFormat::Anthropic
    } else {
        ApiFormat::OpenAi
    }
}

/// 规范化 base_url：去掉末尾斜杠，合并协议之后的重复斜杠
pub fn normalize_base_url(base_url: &str) -> String {
    let url = base_url.trim().trim_end_matches('/');

    match url.find("://") {
        Some(pos) => {
            let (scheme, rest) = url.split_at(pos + 3);
            let mut path = rest.to_string();
            while path.contains("//") {
                path = path.replace("//", "/");
            }
            format!("{}{}", scheme, path)
        }
        None => url.to_string(),
    }
}

/// 拼接端点：已经是完整端点则原样返回，以 /v1 结尾则只补后缀
fn join_endpoint(base_url: &str, suffix: &str) -> String {
    let url = normalize_base_url(base_url);

    if url.ends_with(suffix) {
        url
    } else if url.ends_with("/v1") {
        format!("{}{}", url, suffix)
    } else {
        format!("{}/v1{}", url, suffix)
    }
}

/// 构建 OpenAI Chat Completions 端点
pub fn build_openai_endpoint(base_url: &str) -> String {
    join_endpoint(base_url, "/chat/completions")
}

/// 构建 Anthropic Messages 端点
pub fn build_anthropic_endpoint(base_url: &str) -> String {
    join_endpoint(base_url, "/messages")
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// 从服务商错误响应体中提取可读信息
///
/// OpenAI 与 Anthropic 都使用 `{"error": {"message": ...}}`，其余情况截断原文
pub fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.chars().take(500).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_api_format() {
        assert_eq!(detect_api_format("gpt-4o-mini"), ApiFormat::OpenAi);
        assert_eq!(detect_api_format("gemini-2.0-flash"), ApiFormat::OpenAi);
        assert_eq!(detect_api_format("claude-3-5-haiku"), ApiFormat::Anthropic);
        assert_eq!(detect_api_format("Claude-Sonnet"), ApiFormat::Anthropic);
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://api.openai.com/"), "https://api.openai.com");
        assert_eq!(normalize_base_url("https://api.openai.com//v1"), "https://api.openai.com/v1");
        assert_eq!(normalize_base_url(" http://localhost:11434/// "), "http://localhost:11434");
    }

    #[test]
    fn test_build_endpoints() {
        assert_eq!(
            build_openai_endpoint("https://api.openai.com"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            build_openai_endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            build_openai_endpoint("https://proxy.local/v1/chat/completions"),
            "https://proxy.local/v1/chat/completions"
        );
        assert_eq!(
            build_anthropic_endpoint("https://api.anthropic.com"),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"message":"Invalid API key","type":"auth"}}"#;
        assert_eq!(extract_error_message(body), "Invalid API key");
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
    }
}
