pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod ui;

use crate::{models::ModelManager, utils::error::ClassifierError, Config, Result};
use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

pub async fn serve(config: Config) -> Result<()> {
    // 绑定地址在加载模型之前解析
    let addr = config.socket_addr()?;

    // 初始化模型管理器
    ModelManager::init(config.clone())?;

    let app = create_app(config.clone());

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /predict        - JSON base64 upload");
    tracing::info!("  POST /predict/upload - Multipart file upload");
    tracing::info!("  GET  /               - Upload page");
    tracing::info!("  GET  /health         - Health check");
    tracing::info!("  GET  /api/info       - Service information");

    let served = async {
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            ClassifierError::Internal(format!("Failed to bind to address {}: {}", addr, e))
        })?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ClassifierError::Internal(format!("Server failed: {}", e)))
    }
    .await;

    // 无论监听失败还是服务结束都释放模型会话
    crate::models::shutdown()?;
    served
}

pub fn create_app(config: Config) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict_json_handler))
        .route("/predict/upload", post(handlers::predict_upload_handler))
        .route("/", get(ui::index_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        // 提取器默认的 2MB 上限关闭，由 RequestBodyLimitLayer 统一限制
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.server_config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server_config.request_timeout,
        )))
        .layer(CorsLayer::permissive())
        .with_state(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// 健康检查端点
async fn health_handler() -> Result<Json<serde_json::Value>> {
    crate::models::health_check()?;
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// 服务信息端点
async fn info_handler() -> Result<Json<serde_json::Value>> {
    let stats = crate::models::get_model_stats()?;
    Ok(Json(json!({
        "service": "Photo Classifier Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "model": stats,
        "features": {
            "base64_upload": true,
            "multipart_upload": true,
            "top_k": true,
            "output_formats": ["json", "text"]
        }
    })))
}
