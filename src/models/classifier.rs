use crate::image::preprocessing::NormalizedTensor;
use crate::models::backend::{InferenceBackend, OrtBackend};
use crate::utils::error::ClassifierError;
use crate::{Config, Result};
use parking_lot::Mutex;
use std::time::Instant;

enum SessionState {
    Loaded(Box<dyn InferenceBackend>),
    Closed,
}

/// 已加载的分类器会话
///
/// 会话只加载一次，可重复调用 `classify`，`close` 之后任何推理都会失败。
/// 推理期间持有互斥锁，并发请求在此串行化。
pub struct ClassifierSession {
    state: Mutex<SessionState>,
    backend_name: String,
    input_shape: [usize; 4], // [1, H, W, 3]
    output_width: usize,
}

impl ClassifierSession {
    pub fn new(
        backend: Box<dyn InferenceBackend>,
        input_shape: [usize; 4],
        output_width: usize,
    ) -> Result<Self> {
        if input_shape.iter().any(|&d| d == 0) || input_shape[0] != 1 || input_shape[3] != 3 {
            return Err(ClassifierError::Config(format!(
                "Input shape must be [1, H, W, 3] with positive H and W, got {:?}",
                input_shape
            )));
        }
        if output_width == 0 {
            return Err(ClassifierError::Config(
                "Output width must be positive".to_string(),
            ));
        }

        Ok(Self {
            backend_name: backend.name().to_string(),
            state: Mutex::new(SessionState::Loaded(backend)),
            input_shape,
            output_width,
        })
    }

    /// 加载ONNX模型
    pub fn load(config: &Config, expected_width: usize) -> Result<Self> {
        let backend = OrtBackend::new(config)?;
        Self::from_backend(Box::new(backend), config, expected_width)
    }

    /// 模型声明了固定类别数时以声明为准，否则使用期望的类别数
    pub fn from_backend(
        backend: Box<dyn InferenceBackend>,
        config: &Config,
        expected_width: usize,
    ) -> Result<Self> {
        let output_width = match backend.output_width() {
            Some(declared) => {
                if declared != expected_width {
                    tracing::warn!(
                        "Model declares {} classes, expected {}",
                        declared,
                        expected_width
                    );
                }
                declared
            }
            None => expected_width,
        };
        Self::new(backend, config.input_shape(), output_width)
    }

    /// 同步推理，返回与标签表顺序一致的 C 个分数
    pub fn classify(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>> {
        if tensor.shape() != self.input_shape {
            return Err(ClassifierError::ShapeMismatch {
                expected: format!("{:?}", self.input_shape),
                actual: format!("{:?}", tensor.shape()),
            });
        }

        let mut state = self.state.lock();
        let backend = match &mut *state {
            SessionState::Loaded(backend) => backend,
            SessionState::Closed => return Err(ClassifierError::SessionClosed),
        };

        let start = Instant::now();
        let scores = backend.infer(tensor)?;
        drop(state);

        if scores.len() != self.output_width {
            return Err(ClassifierError::ShapeMismatch {
                expected: format!("[1, {}]", self.output_width),
                actual: format!("{} scores", scores.len()),
            });
        }

        tracing::debug!(
            "Inference finished: backend={}, classes={}, time={:.3}ms",
            self.backend_name,
            scores.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(scores)
    }

    /// 释放会话，重复调用无副作用。返回本次调用是否真正释放了资源。
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, SessionState::Closed) {
            SessionState::Loaded(backend) => {
                drop(backend);
                tracing::info!("Classifier session closed ({})", self.backend_name);
                true
            }
            SessionState::Closed => false,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock(), SessionState::Loaded(_))
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    pub fn output_width(&self) -> usize {
        self.output_width
    }
}
