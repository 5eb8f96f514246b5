//! LLM 请求日志记录器
//!
//! 把每次模型调用记录到 JSONL 文件，便于排查生成失败的原因。

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

use crate::llm::{ChatMessage, ChatOptions};

const LOG_FILE_NAME: &str = "llm_requests.jsonl";
const DEFAULT_MAX_ENTRIES: usize = 1000;

/// 请求日志条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// 请求 ID
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub api_format: String,
    pub endpoint: String,
    pub base_url: String,
    /// API 密钥（脱敏）
    pub api_key_masked: String,
    pub model: String,
    pub messages_count: usize,
    pub messages_preview: Vec<MessagePreview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub json_output: bool,
    /// 超时时间（秒）
    pub timeout: u64,
    /// pending / success / error
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// 消息预览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePreview {
    pub role: String,
    pub content_preview: String,
}

/// 请求日志记录器
pub struct RequestLogger {
    log_path: PathBuf,
    max_entries: usize,
    file: Mutex<Option<File>>,
}

impl RequestLogger {
    /// 创建新的日志记录器，默认目录为可执行文件旁的 storage/
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        let log_dir = log_dir.unwrap_or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("storage")
        });

        if let Err(e) = fs::create_dir_all(&log_dir) {
            warn!("无法创建日志目录 {}: {}", log_dir.display(), e);
        }

        Self {
            log_path: log_dir.join(LOG_FILE_NAME),
            max_entries: DEFAULT_MAX_ENTRIES,
            file: Mutex::new(None),
        }
    }

    /// 设置保留的最大条目数
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// 生成请求 ID
    pub fn generate_request_id() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    /// API 密钥脱敏
    pub fn mask_api_key(api_key: &str) -> String {
        let chars: Vec<char> = api_key.chars().collect();
        if chars.len() <= 8 {
            "*".repeat(chars.len())
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }

    /// 按字符截断，避免切断多字节字符
    fn truncate(s: &str, max_chars: usize) -> String {
        if s.chars().count() <= max_chars {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_chars).collect();
            format!("{}...", head)
        }
    }

    fn create_message_previews(messages: &[ChatMessage], max_chars: usize) -> Vec<MessagePreview> {
        messages
            .iter()
            .map(|m| MessagePreview {
                role: m.role.clone(),
                content_preview: Self::truncate(&m.content, max_chars),
            })
            .collect()
    }

    /// 记录请求开始，返回待补全的条目
    #[allow(clippy::too_many_arguments)]
    pub fn log_request(
        &self,
        api_format: &str,
        endpoint: &str,
        base_url: &str,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
        timeout: u64,
    ) -> LogEntry {
        LogEntry {
            request_id: Self::generate_request_id(),
            timestamp: Utc::now(),
            api_format: api_format.to_string(),
            endpoint: endpoint.to_string(),
            base_url: base_url.to_string(),
            api_key_masked: Self::mask_api_key(api_key),
            model: model.to_string(),
            messages_count: messages.len(),
            messages_preview: Self::create_message_previews(messages, 200),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            json_output: options.json_output,
            timeout,
            status: "pending".to_string(),
            duration_ms: None,
            response_length: None,
            response_preview: None,
            error_type: None,
            error_message: None,
            status_code: None,
        }
    }

    /// 记录成功
    pub fn log_success(&self, mut entry: LogEntry, start_time: Instant, response: &str) {
        entry.status = "success".to_string();
        entry.duration_ms = Some(start_time.elapsed().as_millis() as u64);
        entry.response_length = Some(response.chars().count());
        entry.response_preview = Some(Self::truncate(response, 300));
        self.write_entry(&entry);
    }

    /// 记录错误
    pub fn log_error(
        &self,
        mut entry: LogEntry,
        start_time: Instant,
        error_type: &str,
        error_message: &str,
        status_code: Option<u16>,
    ) {
        entry.status = "error".to_string();
        entry.duration_ms = Some(start_time.elapsed().as_millis() as u64);
        entry.error_type = Some(error_type.to_string());
        entry.error_message = Some(Self::truncate(error_message, 500));
        entry.status_code = status_code;
        self.write_entry(&entry);
    }

    fn write_entry(&self, entry: &LogEntry) {
        let mut file_guard = self.file.lock();

        if file_guard.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.log_path) {
                Ok(f) => *file_guard = Some(f),
                Err(e) => {
                    warn!("无法打开请求日志 {}: {}", self.log_path.display(), e);
                    return;
                }
            }
        }

        if let Some(file) = file_guard.as_mut() {
            if let Ok(json) = serde_json::to_string(entry) {
                let _ = writeln!(file, "{}", json);
                let _ = file.flush();
            }
        }

        self.cleanup_if_needed(&mut file_guard);
    }

    /// 超过上限时只保留最新的 max_entries 行
    fn cleanup_if_needed(&self, file_guard: &mut Option<File>) {
        let lines: Vec<String> = match File::open(&self.log_path) {
            Ok(file) => BufReader::new(file).lines().map_while(Result::ok).collect(),
            Err(_) => return,
        };

        if lines.len() <= self.max_entries {
            return;
        }

        // 重写后旧的追加句柄会指向被截断的文件，需要丢弃
        *file_guard = None;
        let keep = &lines[lines.len() - self.max_entries..];
        if let Ok(mut file) = File::create(&self.log_path) {
            for line in keep {
                let _ = writeln!(file, "{}", line);
            }
        }
    }

    /// 读取最近的日志条目（最新的在前）
    pub fn recent_entries(&self, limit: usize) -> Vec<LogEntry> {
        let file = match File::open(&self.log_path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let mut entries: Vec<LogEntry> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();
        entries.reverse();
        entries.truncate(limit);
        entries
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new(None)
    }
}
