use crate::config::ResizeFilter;
use crate::utils::error::ClassifierError;
use crate::Result;
use image::{imageops, RgbImage};

/// 图像变换工具集
pub struct ImageTransforms;

impl ImageTransforms {
    /// 拉伸缩放到精确尺寸（不保持宽高比，不裁剪不填充）
    pub fn resize(image: &RgbImage, target_width: u32, target_height: u32) -> Result<RgbImage> {
        Self::resize_with_filter(image, target_width, target_height, ResizeFilter::Bilinear)
    }

    pub fn resize_with_filter(
        image: &RgbImage,
        target_width: u32,
        target_height: u32,
        filter: ResizeFilter,
    ) -> Result<RgbImage> {
        if target_width == 0 || target_height == 0 {
            return Err(ClassifierError::InvalidInput(format!(
                "Target size must be positive, got {}x{}",
                target_width, target_height
            )));
        }

        let (orig_w, orig_h) = image.dimensions();
        if orig_w == 0 || orig_h == 0 {
            return Err(ClassifierError::InvalidInput(format!(
                "Cannot resize an empty image ({}x{})",
                orig_w, orig_h
            )));
        }

        if (orig_w, orig_h) == (target_width, target_height) {
            return Ok(image.clone());
        }

        tracing::trace!(
            "Resizing {}x{} -> {}x{} ({:?})",
            orig_w,
            orig_h,
            target_width,
            target_height,
            filter
        );

        Ok(imageops::resize(
            image,
            target_width,
            target_height,
            filter.filter_type(),
        ))
    }
}
