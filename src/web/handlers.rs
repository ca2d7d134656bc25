use crate::{
    image::ResultFormatter,
    prediction::{PredictionOptions, PredictionPipeline, PredictionResult, PredictionStatus},
    utils::error::ClassifierError,
    web::extractors::{validate_options, RequestId, ValidatedJson},
    Config, Result,
};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::mpsc;

/// JSON请求体（base64模式）
#[derive(Debug, Deserialize)]
pub struct PredictJsonRequest {
    /// Base64编码的图像数据
    pub image: String,

    /// 返回的预测数量
    #[serde(default)]
    pub top_k: Option<usize>,

    /// 输出格式
    #[serde(default)]
    pub output_format: Option<String>,
}

/// JSON响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: String,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// JSON base64上传处理器
pub async fn predict_json_handler(
    State(config): State<Config>,
    RequestId(request_id): RequestId,
    ValidatedJson(request): ValidatedJson<PredictJsonRequest>,
) -> Result<Response> {
    let start_time = Instant::now();

    tracing::info!(
        "Processing JSON prediction request: request_id={}, top_k={:?}, output_format={:?}",
        request_id,
        request.top_k,
        request.output_format
    );

    let options = PredictionOptions {
        top_k: request.top_k,
        output_format: request.output_format,
    };

    let status_tx = progress_channel(&config, &request_id);
    let result = PredictionPipeline::process_base64(request.image, options, status_tx).await?;

    tracing::info!(
        "JSON prediction completed: request_id={}, time={:.3}s",
        request_id,
        start_time.elapsed().as_secs_f32()
    );

    respond(result, request_id)
}

/// Multipart文件上传处理器
pub async fn predict_upload_handler(
    State(config): State<Config>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Response> {
    let start_time = Instant::now();

    tracing::info!("Processing multipart prediction request: request_id={}", request_id);

    let mut image_data: Option<Bytes> = None;
    let mut options = PredictionOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ClassifierError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/") {
                        return Err(ClassifierError::UnsupportedFormat(content_type.to_string()));
                    }
                }

                let data = field.bytes().await.map_err(|e| {
                    ClassifierError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;

                if data.is_empty() {
                    return Err(ClassifierError::InvalidInput("Empty file".to_string()));
                }

                tracing::debug!("Received file: {} bytes", data.len());
                image_data = Some(data);
            }
            "top_k" => {
                let value = field.text().await.map_err(|e| {
                    ClassifierError::InvalidInput(format!("Failed to read top_k field: {}", e))
                })?;
                let top_k = value.trim().parse::<usize>().map_err(|_| {
                    ClassifierError::InvalidInput(format!("Invalid top_k '{}'", value))
                })?;
                options.top_k = Some(top_k);
            }
            "output_format" => {
                let value = field.text().await.map_err(|e| {
                    ClassifierError::InvalidInput(format!(
                        "Failed to read output_format field: {}",
                        e
                    ))
                })?;
                if !value.is_empty() {
                    options.output_format = Some(value);
                }
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    validate_options(options.top_k, options.output_format.as_deref())
        .map_err(ClassifierError::InvalidInput)?;

    let image_data = image_data
        .ok_or_else(|| ClassifierError::InvalidInput("No image file provided".to_string()))?;

    let status_tx = progress_channel(&config, &request_id);
    let result = PredictionPipeline::process_bytes(image_data, options, status_tx).await?;

    tracing::info!(
        "Upload prediction completed: request_id={}, time={:.3}s",
        request_id,
        start_time.elapsed().as_secs_f32()
    );

    respond(result, request_id)
}

/// 开发模式下启动后台任务记录处理进度
fn progress_channel(
    config: &Config,
    request_id: &str,
) -> Option<mpsc::UnboundedSender<PredictionStatus>> {
    if !config.dev_mode {
        return None;
    }

    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<PredictionStatus>();
    let request_id = request_id.to_string();
    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            tracing::debug!(
                "Prediction progress [{}]: {:?} - {:.1}% - {}",
                request_id,
                status.stage,
                status.progress * 100.0,
                status.message
            );
        }
    });

    Some(status_tx)
}

fn respond(result: PredictionResult, request_id: String) -> Result<Response> {
    if result.output_format.as_deref() == Some("text") {
        let body = ResultFormatter::render(&result)?;
        return Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response());
    }

    Ok(Json(ApiResponse::success(result, request_id)).into_response())
}
