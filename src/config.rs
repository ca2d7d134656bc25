use crate::utils::error::ClassifierError;
use crate::Result;
use image::imageops::FilterType;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// 模型配置
    pub model_config: ModelConfig,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// 模型文件路径
    pub model_path: PathBuf,

    /// 标签文件路径，为空时使用类别索引作为标签
    pub labels_path: Option<PathBuf>,

    /// 输入宽度
    pub input_width: u32,

    /// 输入高度
    pub input_height: u32,

    /// 输出类别数量，为空时取标签文件的行数
    pub num_classes: Option<usize>,

    /// 默认返回的预测数量
    pub top_k: usize,

    /// 缩放滤波器
    pub resize_filter: ResizeFilter,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

/// 平滑缩放滤波器（双线性或更高质量）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    #[default]
    Bilinear,
    Bicubic,
    Lanczos,
}

impl ResizeFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Bicubic => FilterType::CatmullRom,
            ResizeFilter::Lanczos => FilterType::Lanczos3,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/classifier.onnx"),
            labels_path: None,
            input_width: 224,
            input_height: 224,
            num_classes: None,
            top_k: 1,
            resize_filter: ResizeFilter::default(),
        }
    }
}

impl Config {
    pub fn new(
        bind_addr: String,
        model_config: ModelConfig,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 50 * 1024 * 1024, // 50MB
        };

        let config = Self {
            bind_addr,
            workers,
            dev_mode,
            model_config,
            onnx_config,
            server_config,
        };
        config.validate()?;

        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        let model = &self.model_config;

        if model.input_width == 0 || model.input_height == 0 {
            return Err(ClassifierError::Config(format!(
                "Input size must be positive, got {}x{}",
                model.input_width, model.input_height
            )));
        }

        if model.num_classes == Some(0) {
            return Err(ClassifierError::Config(
                "Number of classes must be positive".to_string(),
            ));
        }

        if model.top_k == 0 {
            return Err(ClassifierError::Config("top_k must be at least 1".to_string()));
        }

        if !(0..=3).contains(&self.onnx_config.optimization_level) {
            return Err(ClassifierError::Config(format!(
                "Optimization level must be between 0 and 3, got {}",
                self.onnx_config.optimization_level
            )));
        }

        if self.workers == 0 {
            return Err(ClassifierError::Config("workers must be at least 1".to_string()));
        }

        Ok(())
    }

    /// 解析绑定地址
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().map_err(|e| {
            ClassifierError::Config(format!("Invalid bind address {}: {}", self.bind_addr, e))
        })
    }

    /// 模型输入张量形状 [1, H, W, 3]
    pub fn input_shape(&self) -> [usize; 4] {
        [
            1,
            self.model_config.input_height as usize,
            self.model_config.input_width as usize,
            3,
        ]
    }
}
