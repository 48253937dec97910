use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use classifier_core::safetensors_util;
use tch::nn;

use crate::config::TrainingConfig;
use crate::error::{Result, TrainerError};
use crate::labels::LabelVocabulary;

pub const CHECKPOINT_FILE: &str = "best_model.pt";

const CONFIG_KEY: &str = "config";
const BEST_F1_KEY: &str = "best_f1";
const EPOCH_KEY: &str = "epoch";
const VOCABULARY_KEY: &str = "label_vocabulary";

/// Everything stored next to the weights in a checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointMetadata {
    pub config: TrainingConfig,
    pub best_f1: f64,
    /// Zero-based epoch that produced the weights.
    pub epoch: usize,
    pub label_vocabulary: serde_json::Value,
}

pub fn checkpoint_path<P: AsRef<Path>>(checkpoint_dir: P) -> PathBuf {
    checkpoint_dir.as_ref().join(CHECKPOINT_FILE)
}

/// Writes the weights and metadata to `<checkpoint_dir>/best_model.pt`,
/// replacing any earlier checkpoint only once the new file is complete.
pub fn save_best(
    vs: &nn::VarStore,
    config: &TrainingConfig,
    vocabulary: &LabelVocabulary,
    best_f1: f64,
    epoch: usize,
) -> Result<PathBuf> {
    fs::create_dir_all(&config.checkpoint_dir)?;
    let path = checkpoint_path(&config.checkpoint_dir);
    let staging = path.with_extension("pt.tmp");

    let metadata = HashMap::from([
        (CONFIG_KEY.to_string(), serde_json::to_string(config)?),
        (BEST_F1_KEY.to_string(), best_f1.to_string()),
        (EPOCH_KEY.to_string(), epoch.to_string()),
        (VOCABULARY_KEY.to_string(), serde_json::to_string(vocabulary)?),
    ]);

    safetensors_util::save_safetensors(vs, &staging, metadata)?;
    fs::rename(&staging, &path)?;
    Ok(path)
}

pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<CheckpointMetadata> {
    let path = path.as_ref();
    let invalid = |reason: String| TrainerError::Checkpoint {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = safetensors_util::read_metadata(path)?;
    let field = |key: &str| {
        metadata
            .get(key)
            .ok_or_else(|| invalid(format!("missing `{key}` metadata")))
    };

    let config = serde_json::from_str(field(CONFIG_KEY)?)?;
    let best_f1 = field(BEST_F1_KEY)?
        .parse::<f64>()
        .map_err(|e| invalid(format!("bad best_f1: {e}")))?;
    let epoch = field(EPOCH_KEY)?
        .parse::<usize>()
        .map_err(|e| invalid(format!("bad epoch: {e}")))?;
    let label_vocabulary = serde_json::from_str(field(VOCABULARY_KEY)?)?;

    Ok(CheckpointMetadata {
        config,
        best_f1,
        epoch,
        label_vocabulary,
    })
}
