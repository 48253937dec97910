pub mod attention;
pub mod config;
pub mod error;
pub mod pretrained;
pub mod safetensors_util;
pub mod transformer;

pub use config::EncoderConfig;
pub use error::{ModelError, Result};
pub use pretrained::PretrainedDir;
pub use safetensors_util::LoadReport;
pub use transformer::SequenceClassifier;
