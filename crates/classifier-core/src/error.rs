use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("Safetensors error: {0}")]
    SafeTensors(#[from] safetensors::SafeTensorError),

    #[error("Unsupported dtype {dtype} for tensor {name}")]
    UnsupportedDtype { name: String, dtype: String },

    #[error("Shape mismatch for {name}: model expects {expected:?}, weights have {found:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<i64>,
        found: Vec<i64>,
    },

    #[error("Invalid model config: {0}")]
    InvalidConfig(String),

    #[error("Model directory not found: {0}")]
    MissingModelDir(PathBuf),
}

pub type Result<T> = std::result::Result<T, ModelError>;
