use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TrainerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Jsonl,
    Csv,
}

/// Caller-supplied training options.
///
/// Keys this struct does not recognise are kept in `extra` so the configuration
/// stored in a checkpoint is the caller's full dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Local directory holding `tokenizer.json`, `config.json` and `model.safetensors`.
    pub model_name: String,
    #[serde(default)]
    pub data_format: DataFormat,
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    /// Tokens kept per example after truncation.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Fraction of the data held out for validation.
    #[serde(default = "default_val_split")]
    pub val_split: f64,
    #[serde(default = "default_max_grad_norm")]
    pub max_grad_norm: f64,
    /// Consecutive epochs without an F1 improvement before stopping.
    #[serde(default = "default_patience")]
    pub patience: usize,
    pub checkpoint_dir: PathBuf,
    /// Replaced by the number of distinct labels found in the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_labels: Option<usize>,
    /// Seeds the split, the per-epoch shuffle and the classifier init.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_weight_decay() -> f64 {
    0.01
}

fn default_max_length() -> usize {
    128
}

fn default_val_split() -> f64 {
    0.2
}

fn default_max_grad_norm() -> f64 {
    1.0
}

fn default_patience() -> usize {
    3
}

fn default_seed() -> u64 {
    42
}

/// Record of a configured label count being overridden by the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelCountAdjustment {
    pub configured: Option<usize>,
    pub detected: usize,
}

/// A configuration after reconciliation with the loaded data.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub config: TrainingConfig,
    pub adjustment: Option<LabelCountAdjustment>,
}

impl TrainingConfig {
    /// Parses JSON, or YAML when the file ends in `.yaml`/`.yml`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        let config: Self = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(TrainerError::Config("batch_size must be > 0".to_string()));
        }
        if self.epochs == 0 {
            return Err(TrainerError::Config("epochs must be > 0".to_string()));
        }
        if self.max_length == 0 {
            return Err(TrainerError::Config("max_length must be > 0".to_string()));
        }
        if !(self.val_split > 0.0 && self.val_split < 1.0) {
            return Err(TrainerError::Config(format!(
                "val_split must be in (0, 1), got {}",
                self.val_split
            )));
        }
        Ok(())
    }

    /// Derives the configuration actually used for training: `num_labels` always
    /// follows the number of classes observed in the data.
    pub fn reconcile(&self, detected_num_labels: usize) -> Reconciled {
        let adjustment = (self.num_labels != Some(detected_num_labels)).then_some(LabelCountAdjustment {
            configured: self.num_labels,
            detected: detected_num_labels,
        });

        let config = Self {
            num_labels: Some(detected_num_labels),
            ..self.clone()
        };

        Reconciled { config, adjustment }
    }

    /// Label count after reconciliation.
    pub fn num_labels(&self) -> usize {
        self.num_labels.unwrap_or(0)
    }
}
