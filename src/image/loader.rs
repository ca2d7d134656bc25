use crate::utils::error::ClassifierError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use std::path::Path;
use tokio::io::AsyncRead;

/// 单张图像的最大字节数
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

pub struct ImageLoader;

impl ImageLoader {
    /// 从base64字符串加载图像
    pub fn from_base64(base64_data: &str) -> Result<DynamicImage> {
        // 移除可能的数据URL前缀 (data:image/xxx;base64,)
        let base64_clean = match base64_data.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
            None => base64_data,
        };

        let image_bytes = base64::engine::general_purpose::STANDARD.decode(base64_clean.trim())?;

        Self::from_bytes(&image_bytes)
    }

    /// 从字节加载图像
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        Self::check_size(bytes.len())?;

        if let Some(format) = Self::detect_format(bytes) {
            if !Self::is_supported_format(format) {
                return Err(ClassifierError::UnsupportedFormat(format!("{:?}", format)));
            }
        }

        let image = image::load_from_memory(bytes)?;
        Ok(image)
    }

    /// 从文件路径加载图像
    pub fn from_path(path: impl AsRef<Path>) -> Result<DynamicImage> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        Self::check_size(metadata.len() as usize)?;

        tracing::debug!("Loading image from: {}", path.display());
        let image = image::open(path)?;

        Ok(image)
    }

    /// 异步从流加载图像
    pub async fn from_stream<R>(mut reader: R) -> Result<DynamicImage>
    where
        R: AsyncRead + Unpin,
    {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;

        Self::from_bytes(&buffer)
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Tiff
                | ImageFormat::WebP
                | ImageFormat::Gif
        )
    }

    /// 转换为RGB图像，丢弃alpha通道
    pub fn to_rgb(image: &DynamicImage) -> Result<RgbImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ClassifierError::InvalidInput(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        Ok(image.to_rgb8())
    }

    fn check_size(len: usize) -> Result<()> {
        if len > MAX_IMAGE_BYTES {
            return Err(ClassifierError::FileTooLarge(len, MAX_IMAGE_BYTES));
        }
        Ok(())
    }
}
