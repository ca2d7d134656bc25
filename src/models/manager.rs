use crate::models::{ClassifierSession, LabelTable};
use crate::utils::error::ClassifierError;
use crate::{Config, Result};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;

/// 全局模型管理器单例
pub struct ModelManager {
    classifier: Arc<ClassifierSession>,
    labels: Arc<LabelTable>,
    config: Config,
}

static MODEL_MANAGER: OnceCell<Arc<Mutex<ModelManager>>> = OnceCell::new();

impl ModelManager {
    /// 加载模型和标签并初始化全局管理器
    pub fn init(config: Config) -> Result<()> {
        tracing::info!("Initializing model manager...");

        let labels = Self::load_labels(&config)?;
        let classifier = ClassifierSession::load(&config, labels.len())?;

        Self::install(classifier, labels, config)
    }

    /// 使用已构建的会话初始化全局管理器
    pub fn install(classifier: ClassifierSession, labels: LabelTable, config: Config) -> Result<()> {
        let manager = Self::new(classifier, labels, config)?;

        MODEL_MANAGER
            .set(Arc::new(Mutex::new(manager)))
            .map_err(|_| ClassifierError::Internal("Model manager already initialized".to_string()))?;

        tracing::info!("Model manager initialized successfully");
        Ok(())
    }

    /// 构建管理器并校验标签数量与模型输出宽度一致
    pub fn new(classifier: ClassifierSession, labels: LabelTable, config: Config) -> Result<Self> {
        if labels.len() != classifier.output_width() {
            return Err(ClassifierError::LabelMismatch {
                labels: labels.len(),
                scores: classifier.output_width(),
            });
        }

        Ok(Self {
            classifier: Arc::new(classifier),
            labels: Arc::new(labels),
            config,
        })
    }

    /// 按配置加载标签表：优先读取标签文件，否则使用类别索引
    pub fn load_labels(config: &Config) -> Result<LabelTable> {
        let model = &config.model_config;

        let labels = match (&model.labels_path, model.num_classes) {
            (Some(path), num_classes) => {
                let labels = LabelTable::from_file(path)?;
                if let Some(expected) = num_classes {
                    if expected != labels.len() {
                        return Err(ClassifierError::Config(format!(
                            "Label file {} has {} entries but num_classes is {}",
                            path.display(),
                            labels.len(),
                            expected
                        )));
                    }
                }
                labels
            }
            (None, Some(num_classes)) => {
                tracing::info!("No label file configured, using class indices as labels");
                LabelTable::numeric(num_classes)
            }
            (None, None) => {
                return Err(ClassifierError::Config(
                    "Either a label file or num_classes must be configured".to_string(),
                ))
            }
        };

        Ok(labels)
    }

    /// 获取全局模型管理器实例
    pub fn instance() -> Result<Arc<Mutex<ModelManager>>> {
        MODEL_MANAGER.get().cloned().ok_or(ClassifierError::ModelNotLoaded)
    }

    pub fn classifier(&self) -> Arc<ClassifierSession> {
        Arc::clone(&self.classifier)
    }

    pub fn labels(&self) -> Arc<LabelTable> {
        Arc::clone(&self.labels)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 模型健康检查
    pub fn health_check(&self) -> Result<()> {
        if !self.classifier.is_open() {
            return Err(ClassifierError::SessionClosed);
        }
        tracing::debug!("Model health check passed");
        Ok(())
    }

    pub fn get_stats(&self) -> ModelStats {
        let model = &self.config.model_config;
        ModelStats {
            backend: self.classifier.backend_name().to_string(),
            session_open: self.classifier.is_open(),
            input_width: model.input_width,
            input_height: model.input_height,
            num_classes: self.labels.len(),
            default_top_k: model.top_k,
            resize_filter: model.resize_filter,
            intra_threads: self.config.onnx_config.intra_threads,
            optimization_level: self.config.onnx_config.optimization_level,
        }
    }

    /// 释放分类器会话
    pub fn shutdown(&self) {
        if self.classifier.close() {
            tracing::info!("Model manager released classifier session");
        }
    }
}

/// 模型统计信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStats {
    pub backend: String,
    pub session_open: bool,
    pub input_width: u32,
    pub input_height: u32,
    pub num_classes: usize,
    pub default_top_k: usize,
    pub resize_filter: crate::config::ResizeFilter,
    pub intra_threads: usize,
    pub optimization_level: i32,
}

/// 便捷函数：获取分类器
pub fn get_classifier() -> Result<Arc<ClassifierSession>> {
    let manager = ModelManager::instance()?;
    let guard = manager.lock();
    Ok(guard.classifier())
}

/// 便捷函数：获取标签表
pub fn get_labels() -> Result<Arc<LabelTable>> {
    let manager = ModelManager::instance()?;
    let guard = manager.lock();
    Ok(guard.labels())
}

/// 便捷函数：检查模型健康状态
pub fn health_check() -> Result<()> {
    let manager = ModelManager::instance()?;
    let guard = manager.lock();
    guard.health_check()
}

/// 便捷函数：获取模型统计信息
pub fn get_model_stats() -> Result<ModelStats> {
    let manager = ModelManager::instance()?;
    let guard = manager.lock();
    Ok(guard.get_stats())
}

/// 便捷函数：释放模型资源
pub fn shutdown() -> Result<()> {
    let manager = ModelManager::instance()?;
    let guard = manager.lock();
    guard.shutdown();
    Ok(())
}
