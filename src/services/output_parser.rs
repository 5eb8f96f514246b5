//! 模型输出解析
//!
//! 把模型返回的原始文本强制转换为 `SuggestionResponse`。
//! 所有形状不符的情况都在这里变成 `ParseError`，不会把半成品交给调用方。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::models::SuggestionResponse;

/// 残留的模板占位符，如 `{{{weatherForecast}}}` 或 `{{ cityEvents }}`
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\{?\s*[A-Za-z_][A-Za-z0-9_]*\s*\}?\}\}").expect("placeholder regex is valid")
});

/// 解析错误
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("输出中没有 JSON 对象")]
    NoJsonObject,

    #[error("输出不符合约定结构: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("notificationMessage 为空")]
    EmptyMessage,

    #[error("notificationMessage 中残留模板占位符: {0}")]
    Placeholder(String),
}

/// 模型输出的约定结构，多余或缺失的键都视为不合法
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSuggestion {
    #[serde(rename = "notificationMessage")]
    notification_message: String,
    #[serde(default)]
    reasoning: Option<String>,
}

/// 从模型输出中提取 JSON 对象文本
///
/// 支持以下格式：
/// 1. 直接的 JSON: `{ ... }`
/// 2. 被 markdown 代码块包裹: ` ```json { ... } ``` `
/// 3. 前后夹杂说明文字，取第一个 `{` 到最后一个 `}`
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();

    let body = match trimmed.find("```") {
        Some(fence) => {
            let after = &trimmed[fence + 3..];
            let after = after.strip_prefix("json").unwrap_or(after);
            match after.find("```") {
                Some(end) => &after[..end],
                None => after,
            }
        }
        None => trimmed,
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&body[start..=end])
}

/// 校验并转换模型输出
pub fn parse_suggestion(raw: &str) -> Result<SuggestionResponse, ParseError> {
    let trimmed = raw.trim();

    // 整体就是合法 JSON 时直接使用，字符串里的 ``` 或花括号不影响结果
    let parsed: RawSuggestion = match serde_json::from_str(trimmed) {
        Ok(parsed) => parsed,
        Err(_) => {
            let json = extract_json_object(trimmed).ok_or(ParseError::NoJsonObject)?;
            serde_json::from_str(json)?
        }
    };

    if parsed.notification_message.trim().is_empty() {
        return Err(ParseError::EmptyMessage);
    }
    if let Some(found) = PLACEHOLDER_RE.find(&parsed.notification_message) {
        return Err(ParseError::Placeholder(found.as_str().to_string()));
    }

    Ok(SuggestionResponse {
        notification_message: parsed.notification_message,
        reasoning: parsed.reasoning,
    })
}
