//! 统一 LLM 客户端

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use super::anthropic::complete_anthropic;
use super::format::{build_anthropic_endpoint, build_openai_endpoint, detect_api_format, ApiFormat};
use super::openai::complete_openai;
use super::types::{ChatMessage, ChatModel, ChatOptions, Completion, LlmError};
use crate::utils::RequestLogger;

/// 统一 LLM 客户端
///
/// 支持 OpenAI 和 Anthropic API 格式，根据模型名称自动选择
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout_secs: u64,
    logger: Option<Arc<RequestLogger>>,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::ConfigError("API Key is required".to_string()));
        }
        let model = model.into();
        if model.is_empty() {
            return Err(LlmError::ConfigError("Model name is required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(30)))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(LlmError::HttpError)?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
            model,
            timeout_secs,
            logger: None,
        })
    }

    /// 附加请求日志记录器
    pub fn with_logger(mut self, logger: Arc<RequestLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    fn endpoint(&self, api_format: ApiFormat) -> String {
        match api_format {
            ApiFormat::OpenAi => build_openai_endpoint(&self.base_url),
            ApiFormat::Anthropic => build_anthropic_endpoint(&self.base_url),
        }
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<Completion, LlmError> {
        let api_format = detect_api_format(&self.model);
        info!("LLM request: model={}, api_format={:?}", self.model, api_format);

        let start = Instant::now();
        let entry = self.logger.as_ref().map(|logger| {
            logger.log_request(
                api_format.as_str(),
                &self.endpoint(api_format),
                &self.base_url,
                &self.api_key,
                &self.model,
                &messages,
                &options,
                self.timeout_secs,
            )
        });

        let result = match api_format {
            ApiFormat::OpenAi => {
                complete_openai(
                    &self.client,
                    &self.api_key,
                    &self.base_url,
                    &messages,
                    &self.model,
                    &options,
                )
                .await
            }
            ApiFormat::Anthropic => {
                complete_anthropic(
                    &self.client,
                    &self.api_key,
                    &self.base_url,
                    &messages,
                    &self.model,
                    &options,
                )
                .await
            }
        };

        if let (Some(logger), Some(entry)) = (self.logger.as_ref(), entry) {
            match &result {
                Ok(completion) => logger.log_success(entry, start, &completion.content),
                Err(e) => logger.log_error(entry, start, e.kind(), &e.to_string(), e.status_code()),
            }
        }

        result
    }
}
