//! LLM 服务封装
//!
//! 封装 LlmClient，与配置系统集成。配置变更后调用 `refresh_client` 重建客户端。

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::llm::{ChatMessage, ChatModel, ChatOptions, Completion, LlmClient, LlmError};
use crate::utils::RequestLogger;

/// LLM 服务
pub struct LlmService {
    client: RwLock<Option<Arc<LlmClient>>>,
    logger: Option<Arc<RequestLogger>>,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &AppConfig, logger: Option<Arc<RequestLogger>>) -> Self {
        let service = Self {
            client: RwLock::new(None),
            logger,
        };
        service.refresh_client(config);
        service
    }

    /// 刷新客户端（按给定配置重建）
    pub fn refresh_client(&self, config: &AppConfig) {
        if config.api_key.is_empty() {
            warn!("API Key 未配置，通知建议功能不可用");
            *self.client.write() = None;
            return;
        }

        match LlmClient::new(&config.api_key, &config.base_url, &config.model, config.timeout_secs) {
            Ok(client) => {
                let client = match &self.logger {
                    Some(logger) if config.request_log_enabled => client.with_logger(Arc::clone(logger)),
                    _ => client,
                };
                info!("LLM 客户端已就绪: model={}", config.model);
                *self.client.write() = Some(Arc::new(client));
            }
            Err(e) => {
                warn!("创建 LLM 客户端失败: {}", e);
                *self.client.write() = None;
            }
        }
    }

    /// 是否已有可用客户端
    pub fn is_configured(&self) -> bool {
        self.client.read().is_some()
    }
}

#[async_trait]
impl ChatModel for LlmService {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<Completion, LlmError> {
        // 先克隆出 Arc，避免跨 await 持有读锁
        let client = self.client.read().clone().ok_or_else(|| {
            LlmError::ConfigError("API Key not configured. Please set it in Settings.".to_string())
        })?;

        client.complete(messages, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_service_reports_config_error() {
        let service = LlmService::new(&AppConfig::default(), None);
        assert!(!service.is_configured());

        let err = service
            .complete(vec![ChatMessage::user("oi")], ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }

    #[test]
    fn test_refresh_picks_up_api_key() {
        let service = LlmService::new(&AppConfig::default(), None);
        let config = AppConfig {
            api_key: "sk-test".to_string(),
            ..Default::default()
        };
        service.refresh_client(&config);
        assert!(service.is_configured());

        service.refresh_client(&AppConfig::default());
        assert!(!service.is_configured());
    }
}
