#![allow(dead_code)]

use photo_classifier::config::{Config, ModelConfig};
use photo_classifier::image::NormalizedTensor;
use photo_classifier::models::{ClassifierSession, InferenceBackend, LabelTable};
use photo_classifier::Result;

/// 固定分数的推理后端
pub struct FixedScores(pub Vec<f32>);

impl InferenceBackend for FixedScores {
    fn name(&self) -> &str {
        "fixed"
    }

    fn infer(&mut self, _input: &NormalizedTensor) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// 按图像亮度给出 [亮, 暗] 两类分数
pub struct BrightnessBackend;

impl InferenceBackend for BrightnessBackend {
    fn name(&self) -> &str {
        "brightness"
    }

    fn infer(&mut self, input: &NormalizedTensor) -> Result<Vec<f32>> {
        let values = input.to_vec();
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        Ok(vec![mean, 1.0 - mean])
    }
}

pub fn config(width: u32, height: u32, num_classes: usize, top_k: usize) -> Config {
    let model = ModelConfig {
        input_width: width,
        input_height: height,
        num_classes: Some(num_classes),
        top_k,
        ..ModelConfig::default()
    };
    Config::new("127.0.0.1:0".to_string(), model, Some(1), true).unwrap()
}

pub fn brightness_session(width: u32, height: u32) -> ClassifierSession {
    ClassifierSession::new(
        Box::new(BrightnessBackend),
        [1, height as usize, width as usize, 3],
        2,
    )
    .unwrap()
}

pub fn brightness_labels() -> LabelTable {
    LabelTable::new(vec!["bright".to_string(), "dark".to_string()])
}

pub fn png_bytes(image: &image::RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
