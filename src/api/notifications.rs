//! 通知建议端点

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::config::get_config;
use crate::error::AppResult;
use crate::models::{SuggestionRequest, SuggestionResponse};
use crate::services::SuggestionService;
use crate::state::AppState;

/// 生成通知建议
///
/// 请求体无法解析返回 400，校验失败返回 422，生成失败返回 502 和统一的重试提示
async fn suggest_notification(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SuggestionRequest>, JsonRejection>,
) -> AppResult<Json<SuggestionResponse>> {
    let Json(req) = payload?;
    let config = get_config();
    let service = SuggestionService::new(Arc::clone(&state.model), &config);
    let suggestion = service.suggest(&req).await?;
    Ok(Json(suggestion))
}

/// 创建通知路由
pub fn notification_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/notifications/suggest", post(suggest_notification))
}
