//! 应用配置管理
//!
//! 配置来源依次为：默认值、config.json、环境变量。使用全局单例管理配置状态。

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::AppError;

/// 配置文件路径环境变量
const CONFIG_PATH_ENV: &str = "NOTIFY_CONFIG_PATH";

/// 获取配置文件路径
///
/// 优先使用 NOTIFY_CONFIG_PATH，否则为可执行文件同级目录下的 config.json
fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.json")
}

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// LLM API 密钥
    #[serde(default)]
    pub api_key: String,

    /// LLM API 基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 模型名称
    #[serde(default = "default_model")]
    pub model: String,

    /// 温度参数 (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// 最大 token 数
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 单次模型调用超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// 通知的目标语言，直接写入提示词
    #[serde(default = "default_output_language")]
    pub output_language: String,

    /// 监听地址
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// 是否记录模型请求日志
    #[serde(default = "default_request_log_enabled")]
    pub request_log_enabled: bool,

    /// 请求日志保留的最大条目数
    #[serde(default = "default_request_log_max_entries")]
    pub request_log_max_entries: usize,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_output_language() -> String {
    "português brasileiro".to_string()
}

fn default_server_addr() -> String {
    "127.0.0.1:8765".to_string()
}

fn default_request_log_enabled() -> bool {
    true
}

fn default_request_log_max_entries() -> usize {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            output_language: default_output_language(),
            server_addr: default_server_addr(),
            request_log_enabled: default_request_log_enabled(),
            request_log_max_entries: default_request_log_max_entries(),
        }
    }
}

impl AppConfig {
    /// 检查配置取值是否合法
    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::BadRequest(format!(
                "temperature 必须在 0.0 到 2.0 之间，当前为 {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(AppError::BadRequest("max_tokens 必须大于 0".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::BadRequest("timeout_secs 必须大于 0".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::BadRequest("model 不能为空".to_string()));
        }
        if self.output_language.trim().is_empty() {
            return Err(AppError::BadRequest("output_language 不能为空".to_string()));
        }
        if self.request_log_max_entries == 0 {
            return Err(AppError::BadRequest("request_log_max_entries 必须大于 0".to_string()));
        }
        Ok(())
    }

    /// 用环境变量覆盖配置
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("LLM_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = non_empty("LLM_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = non_empty("LLM_MODEL") {
            self.model = v;
        }
        if let Some(v) = non_empty("LLM_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.timeout_secs = secs,
                Err(_) => warn!("忽略无效的 LLM_TIMEOUT_SECS: {}", v),
            }
        }
        if let Some(v) = non_empty("SERVER_ADDR") {
            self.server_addr = v;
        }
    }
}

/// 全局配置单例
static CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| RwLock::new(load_config()));

/// 加载配置：文件 + 环境变量
fn load_config() -> AppConfig {
    let mut config = load_config_from_file().unwrap_or_default();
    config.apply_env_overrides();
    config
}

/// 从文件加载配置
fn load_config_from_file() -> Option<AppConfig> {
    let path = get_config_path();
    if !path.exists() {
        return None;
    }

    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            warn!("读取配置文件 {} 失败: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => {
            info!("已加载配置文件: {}", path.display());
            Some(config)
        }
        Err(e) => {
            warn!("解析配置文件 {} 失败，使用默认配置: {}", path.display(), e);
            None
        }
    }
}

/// 保存配置到文件
fn save_config_to_file(config: &AppConfig) -> Result<(), AppError> {
    let path = get_config_path();
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Config(format!("序列化配置失败: {}", e)))?;
    fs::write(&path, content)
        .map_err(|e| AppError::Config(format!("写入配置文件失败: {}", e)))?;
    Ok(())
}

/// 获取当前配置（克隆）
pub fn get_config() -> AppConfig {
    CONFIG.read().clone()
}

/// 更新配置
///
/// 接收一个闭包来修改配置，校验通过后保存到文件；校验失败时配置保持不变
pub fn update_config<F>(updater: F) -> Result<AppConfig, AppError>
where
    F: FnOnce(&mut AppConfig),
{
    let mut config = CONFIG.write();
    let mut candidate = config.clone();
    updater(&mut candidate);
    candidate.validate()?;
    save_config_to_file(&candidate)?;
    *config = candidate;
    Ok(config.clone())
}
