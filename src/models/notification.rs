//! 通知建议的请求/响应模型
//!
//! 字段名与前端表单保持一致（camelCase）

use serde::{Deserialize, Serialize};

/// 通知建议请求
///
/// 四个字段都是可选的自由文本
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    /// 未来几天的天气预报
    #[serde(default)]
    pub weather_forecast: Option<String>,
    /// 可能影响租户的城市活动
    #[serde(default)]
    pub city_events: Option<String>,
    /// 计划中的楼宇维护安排
    #[serde(default)]
    pub maintenance_schedule: Option<String>,
    /// 之前已发送的通知，用于避免重复
    #[serde(default)]
    pub past_notifications: Option<String>,
}

impl SuggestionRequest {
    /// 三个情境字段（不含历史通知）是否至少有一个非空
    ///
    /// 只含空白的字段视为空，比前端表单的非空判断更严格
    pub fn has_situational_context(&self) -> bool {
        [
            &self.weather_forecast,
            &self.city_events,
            &self.maintenance_schedule,
        ]
        .into_iter()
        .any(|field| is_present(field))
    }
}

/// 去除空白后仍有内容
///
/// `"  \n"` 这类纯空白输入返回 false
pub fn is_present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// 通知建议响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    /// 可直接发送给租户的通知正文
    pub notification_message: String,
    /// 模型对取舍的说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}
