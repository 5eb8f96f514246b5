//! Anthropic Messages API 实现（非流式）

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::format::{build_anthropic_endpoint, extract_error_message};
use super::types::{ChatMessage, ChatOptions, Completion, LlmError};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic 请求载荷
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct AnthropicResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// 将通用消息拆分为 system 字段和对话消息
///
/// 多条 system 消息按顺序用空行拼接
fn split_system<'a>(messages: &'a [ChatMessage]) -> (Option<String>, Vec<AnthropicMessage<'a>>) {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut turns = Vec::new();

    for msg in messages {
        if msg.role == "system" {
            system_parts.push(&msg.content);
        } else {
            turns.push(AnthropicMessage {
                role: &msg.role,
                content: &msg.content,
            });
        }
    }

    let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));
    (system, turns)
}

/// 调用 Anthropic API 并返回完整输出
///
/// Messages API 没有 JSON 模式，结构化输出完全依赖提示词约束
pub async fn complete_anthropic(
    client: &Client,
    api_key: &str,
    base_url: &str,
    messages: &[ChatMessage],
    model: &str,
    options: &ChatOptions,
) -> Result<Completion, LlmError> {
    let endpoint = build_anthropic_endpoint(base_url);
    let (system, turns) = split_system(messages);

    let payload = AnthropicRequest {
        model,
        messages: turns,
        system,
        max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: options.temperature,
    };

    debug!("Anthropic API request: endpoint={}, model={}", endpoint, model);

    let response = client
        .post(&endpoint)
        .header("Content-Type", "application/json")
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);
        error!("Anthropic API error: status={}, message={}", status.as_u16(), message);
        return Err(LlmError::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    let body: AnthropicResponse = response.json().await?;
    into_completion(body, model)
}

fn into_completion(body: AnthropicResponse, model: &str) -> Result<Completion, LlmError> {
    if body.stop_reason.as_deref() == Some("refusal") {
        return Err(LlmError::Refused("refusal".to_string()));
    }

    let content: String = body
        .content
        .into_iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text)
        .collect();

    if content.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    Ok(Completion {
        content,
        finish_reason: body.stop_reason,
        model: body.model.unwrap_or_else(|| model.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_system_messages() {
        let messages = vec![
            ChatMessage::system("persona"),
            ChatMessage::system("regras"),
            ChatMessage::user("contexto"),
        ];
        let (system, turns) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("persona\n\nregras"));
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns[0].content, "contexto");
    }

    #[test]
    fn test_completion_joins_text_blocks() {
        let body: AnthropicResponse = serde_json::from_str(
            r#"{"model":"claude-3-5-haiku","content":[{"type":"text","text":"{\"notificationMessage\":"},{"type":"text","text":"\"Oi\"}"}],"stop_reason":"end_turn"}"#,
        )
        .unwrap();
        let completion = into_completion(body, "claude").unwrap();
        assert_eq!(completion.content, r#"{"notificationMessage":"Oi"}"#);
        assert_eq!(completion.finish_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn test_refusal_stop_reason() {
        let body: AnthropicResponse =
            serde_json::from_str(r#"{"content":[],"stop_reason":"refusal"}"#).unwrap();
        assert!(matches!(into_completion(body, "claude"), Err(LlmError::Refused(_))));
    }
}
