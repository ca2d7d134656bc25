pub mod loader;
pub mod preprocessing;
pub mod postprocessing;
pub mod transforms;

pub use loader::ImageLoader;
pub use preprocessing::{ImagePreprocessor, NormalizedTensor};
pub use postprocessing::{ModelInfo, PredictionResult, RankedLabel, ResultFormatter};
pub use transforms::ImageTransforms;
