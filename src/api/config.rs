//! 配置管理端点

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::{get_config, update_config, AppConfig};
use crate::error::{AppError, AppResult};
use crate::llm::{ChatMessage, ChatModel, ChatOptions, LlmClient};
use crate::state::AppState;
use crate::utils::LogEntry;

/// 配置响应（隐藏 api_key 的实际值）
#[derive(Serialize)]
pub struct ConfigResponse {
    /// 是否已设置 API 密钥
    pub api_key_set: bool,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub output_language: String,
    pub request_log_enabled: bool,
}

impl From<AppConfig> for ConfigResponse {
    fn from(config: AppConfig) -> Self {
        Self {
            api_key_set: !config.api_key.is_empty(),
            base_url: config.base_url,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            output_language: config.output_language,
            request_log_enabled: config.request_log_enabled,
        }
    }
}

/// 配置更新请求
#[derive(Deserialize)]
pub struct ConfigUpdateRequest {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub output_language: Option<String>,
    pub request_log_enabled: Option<bool>,
}

impl ConfigUpdateRequest {
    fn apply(self, config: &mut AppConfig) {
        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if let Some(output_language) = self.output_language {
            config.output_language = output_language;
        }
        if let Some(enabled) = self.request_log_enabled {
            config.request_log_enabled = enabled;
        }
    }
}

/// 配置更新响应
#[derive(Serialize)]
pub struct ConfigUpdateResponse {
    pub success: bool,
    pub message: String,
}

/// 连接测试请求
#[derive(Deserialize)]
pub struct TestConnectionRequest {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// 连接测试响应
#[derive(Serialize)]
pub struct TestConnectionResponse {
    pub success: bool,
    pub message: String,
    pub model: String,
}

/// 请求日志查询参数
#[derive(Deserialize)]
pub struct RequestLogQuery {
    pub limit: Option<usize>,
}

/// 获取当前配置
async fn get_config_handler() -> Json<ConfigResponse> {
    Json(ConfigResponse::from(get_config()))
}

/// 更新配置并刷新模型客户端
async fn update_config_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfigUpdateRequest>,
) -> AppResult<Json<ConfigUpdateResponse>> {
    let config = update_config(|config| req.apply(config))?;

    if let Some(llm_service) = &state.llm_service {
        llm_service.refresh_client(&config);
    }
    info!("配置已更新: model={}", config.model);

    Ok(Json(ConfigUpdateResponse {
        success: true,
        message: "Config updated successfully".to_string(),
    }))
}

/// 测试 LLM 连接
async fn test_connection_handler(
    Json(req): Json<TestConnectionRequest>,
) -> AppResult<Json<TestConnectionResponse>> {
    let config = get_config();

    let api_key = req.api_key.unwrap_or(config.api_key);
    let base_url = req.base_url.unwrap_or(config.base_url);
    let model = req.model.unwrap_or(config.model);

    if api_key.is_empty() {
        return Err(AppError::BadRequest("API Key is required".to_string()));
    }

    let client = LlmClient::new(&api_key, &base_url, &model, config.timeout_secs)
        .map_err(|e| AppError::BadRequest(format!("创建客户端失败: {}", e)))?;

    let options = ChatOptions {
        max_tokens: Some(10),
        ..Default::default()
    };

    client
        .complete(vec![ChatMessage::user("Oi")], options)
        .await
        .map_err(|e| AppError::BadRequest(format!("Connection failed: {}", e)))?;

    Ok(Json(TestConnectionResponse {
        success: true,
        message: "Connection successful".to_string(),
        model,
    }))
}

/// 最近的模型请求日志
async fn recent_requests_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RequestLogQuery>,
) -> Json<Vec<LogEntry>> {
    let limit = query.limit.unwrap_or(50).min(500);
    let entries = state
        .request_logger
        .as_ref()
        .map(|logger| logger.recent_entries(limit))
        .unwrap_or_default();
    Json(entries)
}

/// 创建配置路由
pub fn config_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/config", get(get_config_handler).put(update_config_handler))
        .route("/api/config/test", post(test_connection_handler))
        .route("/api/llm/requests", get(recent_requests_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_response_hides_key() {
        let config = AppConfig {
            api_key: "sk-secret".to_string(),
            ..Default::default()
        };
        let body = serde_json::to_value(ConfigResponse::from(config)).unwrap();
        assert_eq!(body["api_key_set"], true);
        assert!(body.get("api_key").is_none());
        assert!(!body.to_string().contains("sk-secret"));
    }

    #[test]
    fn test_update_request_applies_only_given_fields() {
        let req: ConfigUpdateRequest =
            serde_json::from_str(r#"{"model":"claude-3-5-haiku","timeout_secs":15}"#).unwrap();
        let mut config = AppConfig::default();
        req.apply(&mut config);
        assert_eq!(config.model, "claude-3-5-haiku");
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.base_url, "https://api.openai.com");
    }
}
