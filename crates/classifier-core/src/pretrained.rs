use std::path::{Path, PathBuf};

use crate::config::EncoderConfig;
use crate::error::{ModelError, Result};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE: &str = "config.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// A local pretrained model directory (`tokenizer.json`, `config.json`, `model.safetensors`).
#[derive(Debug, Clone)]
pub struct PretrainedDir {
    root: PathBuf,
}

impl PretrainedDir {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ModelError::MissingModelDir(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.root.join(TOKENIZER_FILE)
    }

    /// `None` when the directory carries no `config.json`.
    pub fn encoder_config(&self) -> Result<Option<EncoderConfig>> {
        let path = self.root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        EncoderConfig::from_file(path).map(Some)
    }

    /// `None` when the directory carries no `model.safetensors`.
    pub fn weights_path(&self) -> Option<PathBuf> {
        let path = self.root.join(WEIGHTS_FILE);
        path.exists().then_some(path)
    }
}
