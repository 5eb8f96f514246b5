//! 应用状态管理
//!
//! 定义在请求处理器之间共享的状态。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::ChatModel;
use crate::services::LlmService;
use crate::utils::RequestLogger;

/// 应用共享状态
///
/// 使用 Arc 包裹以便在多个处理器之间安全共享
#[derive(Clone)]
pub struct AppState {
    /// 通知建议使用的模型
    pub model: Arc<dyn ChatModel>,
    /// 配置驱动的 LLM 服务，配置更新后需要刷新
    pub llm_service: Option<Arc<LlmService>>,
    /// 模型请求日志
    pub request_logger: Option<Arc<RequestLogger>>,
}

impl AppState {
    /// 根据配置创建应用状态
    pub fn from_config(config: &AppConfig) -> Self {
        let request_logger =
            Arc::new(RequestLogger::default().with_max_entries(config.request_log_max_entries));
        let llm_service = Arc::new(LlmService::new(config, Some(Arc::clone(&request_logger))));

        Self {
            llm_service: Some(Arc::clone(&llm_service)),
            request_logger: Some(request_logger),
            ..Self::with_model(llm_service)
        }
    }

    /// 使用指定模型创建状态（不带配置刷新与请求日志）
    pub fn with_model(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            llm_service: None,
            request_logger: None,
        }
    }
}

/// 创建可共享的应用状态
pub fn create_shared_state(config: &AppConfig) -> Arc<AppState> {
    Arc::new(AppState::from_config(config))
}
