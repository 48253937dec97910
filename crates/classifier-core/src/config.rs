use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ModelError, Result};

/// Encoder hyper-parameters, read from a Hugging Face style `config.json`.
///
/// Unknown keys in the file are ignored, and missing keys fall back to the
/// BERT-base values below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Size of the token vocabulary.
    pub vocab_size: i64,
    /// Width of the embeddings and of every hidden state.
    pub hidden_size: i64,
    /// Number of encoder blocks.
    pub num_hidden_layers: i64,
    /// Number of attention heads per block.
    pub num_attention_heads: i64,
    /// Width of the feed-forward layer inside each block.
    pub intermediate_size: i64,
    /// Longest sequence the position table can address.
    pub max_position_embeddings: i64,
    pub type_vocab_size: i64,
    /// Dropout on embeddings and residual branches.
    pub hidden_dropout_prob: f64,
    /// Dropout on attention probabilities.
    pub attention_probs_dropout_prob: f64,
    pub layer_norm_eps: f64,
    pub pad_token_id: i64,
    /// Dropout in front of the classifier; `hidden_dropout_prob` when unset.
    pub classifier_dropout: Option<f64>,
    /// Width of the classification head.
    pub num_labels: i64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            vocab_size: 30522, // bert-base-uncased
            hidden_size: 768,
            num_hidden_layers: 12,
            num_attention_heads: 12,
            intermediate_size: 3072,
            max_position_embeddings: 512,
            type_vocab_size: 2,
            hidden_dropout_prob: 0.1,
            attention_probs_dropout_prob: 0.1,
            layer_norm_eps: 1e-12,
            pad_token_id: 0,
            classifier_dropout: None,
            num_labels: 2,
        }
    }
}

impl EncoderConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn head_size(&self) -> i64 {
        self.hidden_size / self.num_attention_heads
    }

    pub fn classifier_dropout(&self) -> f64 {
        self.classifier_dropout.unwrap_or(self.hidden_dropout_prob)
    }

    pub fn with_num_labels(mut self, num_labels: i64) -> Self {
        self.num_labels = num_labels;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_attention_heads <= 0 || self.hidden_size % self.num_attention_heads != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        if self.vocab_size <= 0 || self.max_position_embeddings <= 0 {
            return Err(ModelError::InvalidConfig(
                "vocab_size and max_position_embeddings must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
