//! API 路由模块

mod config;
mod health;
mod notifications;

pub use config::config_routes;
pub use health::health_routes;
pub use notifications::notification_routes;

use axum::Router;

use crate::state::AppState;
use std::sync::Arc;

/// 创建所有 API 路由
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(config_routes())
        .merge(notification_routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ChatModel, ChatOptions, Completion, LlmError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct FixedModel {
        calls: AtomicUsize,
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _options: ChatOptions,
        ) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(content) => Ok(Completion {
                    content: content.to_string(),
                    ..Default::default()
                }),
                None => Err(LlmError::EmptyResponse),
            }
        }
    }

    fn app(reply: Option<&'static str>) -> (Router, Arc<FixedModel>) {
        let model = Arc::new(FixedModel {
            calls: AtomicUsize::new(0),
            reply,
        });
        let state = Arc::new(AppState::with_model(model.clone()));
        (create_api_routes(state), model)
    }

    async fn post_suggest(router: Router, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/notifications/suggest")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = app(None);
        let response = router
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_suggest_success() {
        let (router, model) = app(Some(
            r#"{"notificationMessage":"Chuva forte prevista para amanhã.","reasoning":"Urgente."}"#,
        ));
        let (status, body) = post_suggest(
            router,
            json!({
                "weatherForecast": "Heavy rain expected tomorrow",
                "cityEvents": "",
                "maintenanceSchedule": "",
                "pastNotifications": ""
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notificationMessage"], "Chuva forte prevista para amanhã.");
        assert_eq!(body["reasoning"], "Urgente.");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_suggest_validation_error() {
        let (router, model) = app(Some(r#"{"notificationMessage":"x"}"#));
        let (status, body) = post_suggest(
            router,
            json!({
                "weatherForecast": "",
                "cityEvents": "",
                "maintenanceSchedule": "",
                "pastNotifications": ""
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "validation");
        assert!(body["error"].as_str().unwrap().contains("pelo menos um"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_suggest_malformed_body_uses_error_envelope() {
        let (router, model) = app(Some(r#"{"notificationMessage":"x"}"#));
        let (status, body) = post_suggest(router, json!({ "weatherForecast": 5 })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "bad_request");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);

        let (router, model) = app(Some(r#"{"notificationMessage":"x"}"#));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/notifications/suggest")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "bad_request");
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_suggest_generation_error_is_generic() {
        let (router, _) = app(None);
        let (status, body) = post_suggest(router, json!({ "cityEvents": "Maratona no domingo" })).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "generation");
        assert_eq!(body["error"], crate::error::GENERATION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_suggest_malformed_model_output() {
        let (router, _) = app(Some(r#"{"message":"chave errada"}"#));
        let (status, body) =
            post_suggest(router, json!({ "maintenanceSchedule": "Elevador na quarta" })).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "generation");
        assert!(body.get("notificationMessage").is_none());
    }
}
