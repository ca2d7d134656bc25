use crate::config::{ModelConfig, ResizeFilter};
use serde::Deserialize;

/// 预测选项
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionOptions {
    /// 返回的预测数量，为空时使用配置默认值
    #[serde(default)]
    pub top_k: Option<usize>,

    /// 输出格式 ("json", "text")
    #[serde(default)]
    pub output_format: Option<String>,
}

/// 流水线所需的模型参数
#[derive(Debug, Clone, Copy)]
pub struct PredictionSettings {
    pub input_width: u32,
    pub input_height: u32,
    pub resize_filter: ResizeFilter,
    pub default_top_k: usize,
}

impl From<&ModelConfig> for PredictionSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            input_width: config.input_width,
            input_height: config.input_height,
            resize_filter: config.resize_filter,
            default_top_k: config.top_k,
        }
    }
}

/// 预测处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionStage {
    Loading,
    Preprocessing,
    Inference,
    Ranking,
    Completed,
}

/// 预测处理状态
#[derive(Debug, Clone)]
pub struct PredictionStatus {
    /// 当前处理阶段
    pub stage: PredictionStage,
    /// 进度 (0.0 - 1.0)
    pub progress: f32,
    /// 状态消息
    pub message: String,
}

impl PredictionStatus {
    pub fn new(stage: PredictionStage, progress: f32, message: &str) -> Self {
        Self {
            stage,
            progress,
            message: message.to_string(),
        }
    }
}

// 重新导出主要类型
pub use crate::image::postprocessing::{ModelInfo, PredictionResult, RankedLabel};
