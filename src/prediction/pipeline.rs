use crate::{
    image::{ImageLoader, ImagePreprocessor, ImageTransforms, ResultFormatter},
    models::{ClassifierSession, LabelTable, ModelManager},
    prediction::{
        ModelInfo, PredictionOptions, PredictionResult, PredictionSettings, PredictionStage,
        PredictionStatus,
    },
    utils::error::ClassifierError,
    Result,
};
use axum::body::Bytes;
use image::{DynamicImage, RgbImage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

type StatusSender = mpsc::UnboundedSender<PredictionStatus>;

/// 图像分类流水线：缩放 → 归一化 → 推理 → 排序
pub struct PredictionPipeline;

/// 一次预测用到的共享模型资源
struct ModelContext {
    classifier: Arc<ClassifierSession>,
    labels: Arc<LabelTable>,
    settings: PredictionSettings,
}

impl ModelContext {
    fn from_manager() -> Result<Self> {
        let manager = ModelManager::instance()?;
        let guard = manager.lock();
        Ok(Self {
            classifier: guard.classifier(),
            labels: guard.labels(),
            settings: PredictionSettings::from(&guard.config().model_config),
        })
    }
}

impl PredictionPipeline {
    /// 对已解码的RGB图像执行完整预测（同步，阻塞调用方直到推理完成）
    pub fn predict_image(
        image: &RgbImage,
        classifier: &ClassifierSession,
        labels: &LabelTable,
        settings: &PredictionSettings,
        options: &PredictionOptions,
    ) -> Result<PredictionResult> {
        Self::run(image, classifier, labels, settings, options, &None, Instant::now())
    }

    /// 处理base64图像
    pub async fn process_base64(
        base64_data: String,
        options: PredictionOptions,
        status_tx: Option<StatusSender>,
    ) -> Result<PredictionResult> {
        Self::process_with(
            move || ImageLoader::from_base64(&base64_data),
            "Loading image from base64",
            options,
            status_tx,
        )
        .await
    }

    /// 处理字节流图像
    pub async fn process_bytes(
        bytes: Bytes,
        options: PredictionOptions,
        status_tx: Option<StatusSender>,
    ) -> Result<PredictionResult> {
        Self::process_with(
            move || ImageLoader::from_bytes(&bytes),
            "Loading image from upload",
            options,
            status_tx,
        )
        .await
    }

    /// 处理本地图像文件
    pub async fn process_path(
        path: PathBuf,
        options: PredictionOptions,
        status_tx: Option<StatusSender>,
    ) -> Result<PredictionResult> {
        Self::process_with(
            move || ImageLoader::from_path(&path),
            "Loading image from file",
            options,
            status_tx,
        )
        .await
    }

    /// 在阻塞线程池中解码并预测
    async fn process_with<F>(
        decode: F,
        loading_message: &'static str,
        options: PredictionOptions,
        status_tx: Option<StatusSender>,
    ) -> Result<PredictionResult>
    where
        F: FnOnce() -> Result<DynamicImage> + Send + 'static,
    {
        // 先获取模型，未加载时立即失败
        let context = ModelContext::from_manager()?;

        tokio::task::spawn_blocking(move || {
            let start_time = Instant::now();
            send_status(&status_tx, PredictionStage::Loading, 0.1, loading_message);

            let image = decode()?;
            let rgb = ImageLoader::to_rgb(&image)?;

            Self::run(
                &rgb,
                &context.classifier,
                &context.labels,
                &context.settings,
                &options,
                &status_tx,
                start_time,
            )
        })
        .await
        .map_err(|e| ClassifierError::Internal(format!("Prediction task failed: {}", e)))?
    }

    fn run(
        image: &RgbImage,
        classifier: &ClassifierSession,
        labels: &LabelTable,
        settings: &PredictionSettings,
        options: &PredictionOptions,
        status_tx: &Option<StatusSender>,
        start_time: Instant,
    ) -> Result<PredictionResult> {
        let top_k = options.top_k.unwrap_or(settings.default_top_k);

        // 缩放与归一化
        send_status(status_tx, PredictionStage::Preprocessing, 0.3, "Resizing and normalizing");
        let resized = ImageTransforms::resize_with_filter(
            image,
            settings.input_width,
            settings.input_height,
            settings.resize_filter,
        )?;
        let tensor = ImagePreprocessor::normalize(&resized);

        // 推理
        send_status(status_tx, PredictionStage::Inference, 0.5, "Running classifier");
        let scores = classifier.classify(&tensor)?;

        // 排序
        send_status(status_tx, PredictionStage::Ranking, 0.9, "Ranking classes");
        let predictions = ResultFormatter::rank(&scores, labels, top_k)?;

        let total_time = start_time.elapsed();
        let result = PredictionResult {
            processing_time: total_time.as_secs_f32(),
            predictions,
            output_format: options.output_format.clone(),
            model_info: Some(ModelInfo {
                backend: classifier.backend_name().to_string(),
                input_width: settings.input_width,
                input_height: settings.input_height,
                num_classes: labels.len(),
            }),
        };

        if let Some(top) = result.top() {
            send_status(
                status_tx,
                PredictionStage::Completed,
                1.0,
                &format!("Predicted '{}' ({:.2}%)", top.label, top.percentage),
            );
            tracing::info!(
                "Prediction completed: label={}, confidence={:.2}%, source={}x{}, total_time={:.3}s",
                top.label,
                top.percentage,
                image.width(),
                image.height(),
                total_time.as_secs_f32()
            );
        }

        Ok(result)
    }
}

fn send_status(
    status_tx: &Option<StatusSender>,
    stage: PredictionStage,
    progress: f32,
    message: &str,
) {
    if let Some(tx) = status_tx {
        let _ = tx.send(PredictionStatus::new(stage, progress, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResizeFilter;
    use crate::image::NormalizedTensor;
    use crate::models::InferenceBackend;
    use approx::assert_relative_eq;
    use image::Rgb;

    /// 返回输入张量均值作为第一个类别分数
    struct MeanBackend;

    impl InferenceBackend for MeanBackend {
        fn name(&self) -> &str {
            "mean"
        }

        fn infer(&mut self, input: &NormalizedTensor) -> Result<Vec<f32>> {
            let values = input.to_vec();
            let mean = values.iter().sum::<f32>() / values.len() as f32;
            Ok(vec![mean, 1.0 - mean])
        }
    }

    fn settings() -> PredictionSettings {
        PredictionSettings {
            input_width: 4,
            input_height: 4,
            resize_filter: ResizeFilter::Bilinear,
            default_top_k: 1,
        }
    }

    fn classifier() -> ClassifierSession {
        ClassifierSession::new(Box::new(MeanBackend), [1, 4, 4, 3], 2).unwrap()
    }

    fn labels() -> LabelTable {
        LabelTable::new(vec!["bright".to_string(), "dark".to_string()])
    }

    #[test]
    fn test_predict_white_image() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let result = PredictionPipeline::predict_image(
            &image,
            &classifier(),
            &labels(),
            &settings(),
            &PredictionOptions::default(),
        )
        .unwrap();

        assert_eq!(result.predictions.len(), 1);
        assert_eq!(result.predictions[0].label, "bright");
        assert_relative_eq!(result.predictions[0].percentage, 100.0);
        let info = result.model_info.unwrap();
        assert_eq!(info.backend, "mean");
        assert_eq!(info.num_classes, 2);
    }

    #[test]
    fn test_predict_top_k_option() {
        let image = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        let options = PredictionOptions {
            top_k: Some(3),
            output_format: Some("text".to_string()),
        };
        let result = PredictionPipeline::predict_image(
            &image,
            &classifier(),
            &labels(),
            &settings(),
            &options,
        )
        .unwrap();

        let names: Vec<&str> = result.predictions.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(names, vec!["dark", "bright"]);
        assert_eq!(result.output_format.as_deref(), Some("text"));
    }

    #[test]
    fn test_predict_after_close_fails() {
        let session = classifier();
        session.close();
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let err = PredictionPipeline::predict_image(
            &image,
            &session,
            &labels(),
            &settings(),
            &PredictionOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ClassifierError::SessionClosed));
    }

    #[test]
    fn test_settings_size_must_match_session() {
        let mut wrong = settings();
        wrong.input_width = 5;
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let err = PredictionPipeline::predict_image(
            &image,
            &classifier(),
            &labels(),
            &wrong,
            &PredictionOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ClassifierError::ShapeMismatch { .. }));
    }
}
