use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Model error: {0}")]
    Model(#[from] classifier_core::ModelError),

    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("No usable samples in {0}")]
    EmptyDataset(PathBuf),

    #[error("Labels mix strings and numbers; use one type per dataset")]
    MixedLabels,

    #[error("Label {label} is outside 0..{num_labels}; numeric labels must be class indices")]
    LabelOutOfRange { label: i64, num_labels: usize },

    #[error("Cannot split dataset: {0}")]
    Split(String),

    #[error("Invalid checkpoint {path}: {reason}")]
    Checkpoint { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, TrainerError>;
