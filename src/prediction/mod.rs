pub mod pipeline;
pub mod types;

pub use pipeline::PredictionPipeline;
pub use types::{
    ModelInfo, PredictionOptions, PredictionResult, PredictionSettings, PredictionStage,
    PredictionStatus, RankedLabel,
};
