//! OpenAI Chat Completions API 实现（非流式）

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::format::{build_openai_endpoint, extract_error_message};
use super::types::{ChatMessage, ChatOptions, Completion, LlmError};

/// OpenAI 请求载荷
#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize, Debug)]
struct OpenAiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize, Debug)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OpenAiMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// 调用 OpenAI API 并返回完整输出
pub async fn complete_openai(
    client: &Client,
    api_key: &str,
    base_url: &str,
    messages: &[ChatMessage],
    model: &str,
    options: &ChatOptions,
) -> Result<Completion, LlmError> {
    let endpoint = build_openai_endpoint(base_url);

    let payload = OpenAiRequest {
        model,
        messages,
        stream: false,
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        response_format: options.json_output.then_some(ResponseFormat {
            format_type: "json_object",
        }),
    };

    debug!("OpenAI API request: endpoint={}, model={}", endpoint, model);

    let response = client
        .post(&endpoint)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);
        error!("OpenAI API error: status={}, message={}", status.as_u16(), message);
        return Err(LlmError::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    let body: OpenAiResponse = response.json().await?;
    into_completion(body, model)
}

fn into_completion(body: OpenAiResponse, model: &str) -> Result<Completion, LlmError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;

    if let Some(refusal) = choice.message.refusal.filter(|r| !r.is_empty()) {
        return Err(LlmError::Refused(refusal));
    }
    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(LlmError::Refused("content_filter".to_string()));
    }

    let content = choice.message.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    Ok(Completion {
        content,
        finish_reason: choice.finish_reason,
        model: body.model.unwrap_or_else(|| model.to_string()),
    })
}
