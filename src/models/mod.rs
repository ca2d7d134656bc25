pub mod backend;
pub mod classifier;
pub mod labels;
pub mod manager;

pub use backend::{InferenceBackend, OrtBackend};
pub use classifier::ClassifierSession;
pub use labels::LabelTable;
pub use manager::{ModelManager, ModelStats};

// Re-export convenience functions from manager
pub use manager::{get_classifier, get_labels, get_model_stats, health_check, shutdown};
