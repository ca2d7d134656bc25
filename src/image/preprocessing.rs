use crate::utils::error::ClassifierError;
use crate::Result;
use image::RgbImage;
use ndarray::{Array4, ArrayView4};

/// 归一化后的输入张量，形状 [1, H, W, 3]（NHWC，RGB顺序）
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array4<f32>,
}

impl NormalizedTensor {
    /// 从扁平数据构建张量，长度必须与形状一致
    pub fn from_shape_vec(height: usize, width: usize, values: Vec<f32>) -> Result<Self> {
        let expected = height * width * 3;
        let actual = values.len();
        let data = Array4::from_shape_vec((1, height, width, 3), values).map_err(|_| {
            ClassifierError::ShapeMismatch {
                expected: format!("{} values for [1, {}, {}, 3]", expected, height, width),
                actual: format!("{} values", actual),
            }
        })?;
        Ok(Self { data })
    }

    pub fn shape(&self) -> [usize; 4] {
        let (n, h, w, c) = self.data.dim();
        [n, h, w, c]
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// 按行优先顺序展开的数值序列
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }
}

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// 像素归一化：逐像素（从上到下、从左到右）输出 R, G, B / 255
    ///
    /// 只做 /255 的线性缩放，不做均值方差标准化。
    pub fn normalize(image: &RgbImage) -> NormalizedTensor {
        let (width, height) = image.dimensions();
        let data = Array4::from_shape_fn(
            (1, height as usize, width as usize, 3),
            |(_, y, x, c)| image.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
        );

        NormalizedTensor { data }
    }
}
