//! Tenant Notification Suggestions - Rust Backend
//!
//! 使用 axum 框架构建的后端服务，根据天气、城市活动和维护安排为房东起草租户通知。

use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod llm;
mod models;
mod services;
mod state;
mod utils;

use api::create_api_routes;
use state::create_shared_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenant_notify_backend=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tenant notification backend...");

    let config = config::get_config();
    info!(
        "LLM: model={}, base_url={}, timeout={}s, language={}",
        config.model, config.base_url, config.timeout_secs, config.output_language
    );

    let state = create_shared_state(&config);

    // 表单前端与后端分开部署，允许所有来源
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(create_api_routes(Arc::clone(&state)))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = config
        .server_addr
        .parse()
        .with_context(|| format!("无效的监听地址: {}", config.server_addr))?;
    info!("Server listening on: {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("无法绑定 {}", addr))?;
    axum::serve(listener, app).await.context("服务器异常退出")?;

    Ok(())
}
