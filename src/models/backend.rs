use crate::image::preprocessing::NormalizedTensor;
use crate::utils::error::ClassifierError;
use crate::{Config, Result};
use memmap2::Mmap;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use std::fs::File;
use std::path::Path;

/// 推理后端：固定形状的浮点输入 → 固定长度的分数向量
pub trait InferenceBackend: Send {
    /// 后端名称（用于日志和统计）
    fn name(&self) -> &str;

    /// 执行一次同步推理
    fn infer(&mut self, input: &NormalizedTensor) -> Result<Vec<f32>>;

    /// 模型声明的输出类别数，动态维度时为 None
    fn output_width(&self) -> Option<usize> {
        None
    }
}

/// ONNX Runtime 后端，模型文件通过内存映射加载
pub struct OrtBackend {
    session: Session,
    input_name: String,
    output_name: String, // 动态发现的输出名称
    declared_width: Option<usize>,
    _model: Mmap,
}

impl OrtBackend {
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_path(&config.model_config.model_path, config)
    }

    pub fn from_path(model_path: &Path, config: &Config) -> Result<Self> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelLoad(format!(
                "Classification model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let file = File::open(model_path)?;
        // SAFETY: 模型文件只读映射，会话存活期间不修改
        let model = unsafe { Mmap::map(&file)? };
        tracing::debug!("Mapped {} bytes of model data", model.len());

        let session = Session::builder()
            .map_err(session_error)?
            .with_optimization_level(optimization_level(config.onnx_config.optimization_level))
            .map_err(session_error)?
            .with_intra_threads(config.onnx_config.intra_threads)
            .map_err(session_error)?
            .commit_from_memory(&model)
            .map_err(session_error)?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no inputs".to_string(),
                ))
            }
        };

        let (output_name, declared_width) = match session.outputs.first() {
            Some(output) => (
                output.name.clone(),
                output
                    .output_type
                    .tensor_shape()
                    .and_then(|shape| declared_classes(shape)),
            ),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no outputs".to_string(),
                ))
            }
        };

        tracing::info!(
            "Classification model ready: input='{}', output='{}', classes={:?}",
            input_name,
            output_name,
            declared_width
        );
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Classification output[{}]: '{}'", i, output.name);
        }

        Ok(Self {
            session,
            input_name,
            output_name,
            declared_width,
            _model: model,
        })
    }
}

/// 输出张量 [1, C] 的最后一维；动态维度（-1）视为未知
fn declared_classes(shape: &[i64]) -> Option<usize> {
    match shape.last() {
        Some(&dim) if dim > 0 => Some(dim as usize),
        _ => None,
    }
}

/// 配置中的优化级别（0-3）映射到 ONNX Runtime 图优化级别
fn optimization_level(level: i32) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

fn session_error(e: impl std::fmt::Display) -> ClassifierError {
    ClassifierError::ModelLoad(format!("Failed to build session: {}", e))
}

impl InferenceBackend for OrtBackend {
    fn name(&self) -> &str {
        "onnxruntime"
    }

    fn output_width(&self) -> Option<usize> {
        self.declared_width
    }

    fn infer(&mut self, input: &NormalizedTensor) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(input.view().to_owned())?;
        let outputs = self
            .session
            .run(inputs![self.input_name.as_str() => input_tensor])?;

        match outputs.get(self.output_name.as_str()) {
            Some(output) => {
                let scores = output.try_extract_array::<f32>()?;
                Ok(scores.iter().copied().collect())
            }
            None => {
                let available_outputs: Vec<String> =
                    outputs.keys().map(|s| s.to_string()).collect();
                Err(ClassifierError::Inference(format!(
                    "Classification output '{}' not found. Available outputs: {:?}",
                    self.output_name, available_outputs
                )))
            }
        }
    }
}
