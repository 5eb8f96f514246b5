//! 通知建议服务
//!
//! 校验 → 渲染 Prompt → 调用一次模型 → 解析输出。成功返回结构化结果，
//! 失败只有两类：输入校验失败（不会调用模型）和生成失败。内部不做重试。

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::output_parser::{parse_suggestion, ParseError};
use super::prompt_service::{PromptService, TemplateError};
use crate::config::AppConfig;
use crate::llm::{ChatModel, ChatOptions, LlmError};
use crate::models::{SuggestionRequest, SuggestionResponse};

/// 输入校验错误
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// 天气、城市活动、维护安排三项全部为空
    #[error("Forneça informações para pelo menos um dos seguintes: Previsão do Tempo, Eventos da Cidade ou Cronograma de Manutenção.")]
    MissingSituationalContext,
}

/// 生成错误
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Prompt 渲染失败: {0}")]
    Prompt(#[from] TemplateError),

    #[error("模型调用失败: {0}")]
    Model(#[from] LlmError),

    #[error("模型调用超过 {0} 秒未返回")]
    Timeout(u64),

    #[error("模型输出无效: {0}")]
    Output(#[from] ParseError),
}

/// 通知建议错误
#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// 通知建议服务
pub struct SuggestionService {
    model: Arc<dyn ChatModel>,
    prompts: PromptService,
    options: ChatOptions,
    timeout: Duration,
}

impl SuggestionService {
    /// 根据当前配置创建服务
    pub fn new(model: Arc<dyn ChatModel>, config: &AppConfig) -> Self {
        Self {
            model,
            prompts: PromptService::new(config.output_language.clone()),
            options: ChatOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
                json_output: true,
            },
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// 覆盖超时时间
    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 校验请求
    ///
    /// 四个字段都可选，但天气、城市活动、维护安排至少要有一项非空（忽略空白）
    pub fn validate(request: &SuggestionRequest) -> Result<(), ValidationError> {
        if request.has_situational_context() {
            Ok(())
        } else {
            Err(ValidationError::MissingSituationalContext)
        }
    }

    /// 生成一条通知建议
    #[instrument(skip_all)]
    pub async fn suggest(&self, request: &SuggestionRequest) -> Result<SuggestionResponse, SuggestionError> {
        Self::validate(request)?;

        let start = Instant::now();
        let result = self.generate(request).await;

        match &result {
            Ok(resp) => info!(
                "通知建议生成成功: {} 字符, reasoning={}, 耗时 {}ms",
                resp.notification_message.chars().count(),
                resp.reasoning.is_some(),
                start.elapsed().as_millis()
            ),
            Err(e) => warn!("通知建议生成失败: {}", e),
        }

        Ok(result?)
    }

    /// 生成并校验：模型调用和输出解析的唯一出口
    async fn generate(&self, request: &SuggestionRequest) -> Result<SuggestionResponse, GenerationError> {
        let messages = self.prompts.build_messages(request)?;

        let completion = tokio::time::timeout(
            self.timeout,
            self.model.complete(messages, self.options.clone()),
        )
        .await
        .map_err(|_| GenerationError::Timeout(self.timeout.as_secs()))??;

        debug!(
            "模型输出: model={}, finish_reason={:?}, {} 字符",
            completion.model,
            completion.finish_reason,
            completion.content.chars().count()
        );
        if completion.finish_reason.as_deref() == Some("length") {
            warn!("模型输出因 max_tokens 被截断: model={}", completion.model);
        }

        Ok(parse_suggestion(&completion.content)?)
    }
}
