use tch::{nn, Kind, Tensor};
use crate::attention::SelfAttention;
use crate::config::EncoderConfig;

fn layer_norm(vs: nn::Path, config: &EncoderConfig) -> nn::LayerNorm {
    nn::layer_norm(
        vs,
        vec![config.hidden_size],
        nn::LayerNormConfig {
            eps: config.layer_norm_eps,
            ..Default::default()
        },
    )
}

/// Word + position + token-type embeddings.
pub struct Embeddings {
    word_embeddings: nn::Embedding,
    position_embeddings: nn::Embedding,
    token_type_embeddings: nn::Embedding,
    norm: nn::LayerNorm,
    dropout: f64,
}

impl Embeddings {
    pub fn new(vs: &nn::Path, config: &EncoderConfig) -> Self {
        let hidden = config.hidden_size;
        Self {
            word_embeddings: nn::embedding(vs / "word_embeddings", config.vocab_size, hidden, Default::default()),
            position_embeddings: nn::embedding(
                vs / "position_embeddings",
                config.max_position_embeddings,
                hidden,
                Default::default(),
            ),
            token_type_embeddings: nn::embedding(
                vs / "token_type_embeddings",
                config.type_vocab_size,
                hidden,
                Default::default(),
            ),
            norm: layer_norm(vs / "LayerNorm", config),
            dropout: config.hidden_dropout_prob,
        }
    }

    /// input_ids: [batch, seq_len]
    pub fn forward(&self, input_ids: &Tensor, train: bool) -> Tensor {
        let seq_len = input_ids.size()[1];
        let positions = Tensor::arange(seq_len, (Kind::Int64, input_ids.device())).unsqueeze(0);
        // Single-segment inputs only.
        let token_types = input_ids.zeros_like();

        let x = input_ids.apply(&self.word_embeddings)
            + positions.apply(&self.position_embeddings)
            + token_types.apply(&self.token_type_embeddings);

        x.apply(&self.norm).dropout(self.dropout, train)
    }
}

/// FeedForward block (MLP) with its residual LayerNorm.
pub struct FeedForward {
    intermediate: nn::Linear,
    output: nn::Linear,
    norm: nn::LayerNorm,
    dropout: f64,
}

impl FeedForward {
    /// `vs` is the layer path; weights live under `intermediate` and `output`.
    pub fn new(vs: &nn::Path, config: &EncoderConfig) -> Self {
        let intermediate = nn::linear(
            vs / "intermediate" / "dense",
            config.hidden_size,
            config.intermediate_size,
            Default::default(),
        );
        let output = nn::linear(
            vs / "output" / "dense",
            config.intermediate_size,
            config.hidden_size,
            Default::default(),
        );

        Self {
            intermediate,
            output,
            norm: layer_norm(vs / "output" / "LayerNorm", config),
            dropout: config.hidden_dropout_prob,
        }
    }

    pub fn forward(&self, x: &Tensor, train: bool) -> Tensor {
        let y = x
            .apply(&self.intermediate)
            .gelu("none")
            .apply(&self.output)
            .dropout(self.dropout, train);
        (y + x).apply(&self.norm)
    }
}

/// Encoder block
pub struct Block {
    attention: SelfAttention,
    feed_forward: FeedForward,
}

impl Block {
    pub fn new(vs: &nn::Path, config: &EncoderConfig) -> Self {
        Self {
            attention: SelfAttention::new(&(vs / "attention"), config),
            feed_forward: FeedForward::new(vs, config),
        }
    }

    pub fn forward(&self, x: &Tensor, mask_bias: &Tensor, train: bool) -> Tensor {
        let x = self.attention.forward(x, mask_bias, train);
        self.feed_forward.forward(&x, train)
    }
}

/// Encoder with a pooled classification head.
///
/// Variables are laid out like `BertForSequenceClassification` (`bert.embeddings.*`,
/// `bert.encoder.layer.{i}.*`, `bert.pooler.dense`, `classifier`), so pretrained
/// weights load by name and only the classifier starts from random values.
pub struct SequenceClassifier {
    embeddings: Embeddings,
    blocks: Vec<Block>,
    pooler: nn::Linear,
    classifier: nn::Linear,
    classifier_dropout: f64,
    pub config: EncoderConfig,
}

impl SequenceClassifier {
    pub fn new(vs: &nn::Path, config: &EncoderConfig) -> Self {
        let bert = vs / "bert";
        let embeddings = Embeddings::new(&(&bert / "embeddings"), config);

        let mut blocks = Vec::new();
        for i in 0..config.num_hidden_layers {
            blocks.push(Block::new(&(&bert / "encoder" / "layer" / i), config));
        }

        let pooler = nn::linear(&bert / "pooler" / "dense", config.hidden_size, config.hidden_size, Default::default());
        let classifier = nn::linear(vs / "classifier", config.hidden_size, config.num_labels, Default::default());

        Self {
            embeddings,
            blocks,
            pooler,
            classifier,
            classifier_dropout: config.classifier_dropout(),
            config: config.clone(),
        }
    }

    /// input_ids, attention_mask: [batch, seq_len] (Int64)
    /// Returns: logits [batch, num_labels]
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor, train: bool) -> Tensor {
        let size = input_ids.size();
        let (b, t) = (size[0], size[1]);

        let mask_bias = ((attention_mask.to_kind(Kind::Float) - 1.0) * 10000.0).view([b, 1, 1, t]);

        let mut x = self.embeddings.forward(input_ids, train);
        for block in &self.blocks {
            x = block.forward(&x, &mask_bias, train);
        }

        // Pool on the first ([CLS]) position.
        let pooled = x.select(1, 0).apply(&self.pooler).tanh();
        pooled
            .dropout(self.classifier_dropout, train)
            .apply(&self.classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    fn tiny_config() -> EncoderConfig {
        EncoderConfig {
            vocab_size: 20,
            hidden_size: 8,
            num_hidden_layers: 1,
            num_attention_heads: 2,
            intermediate_size: 16,
            max_position_embeddings: 16,
            num_labels: 3,
            ..Default::default()
        }
    }

    #[test]
    fn logits_have_one_column_per_label() {
        let vs = nn::VarStore::new(Device::Cpu);
        let model = SequenceClassifier::new(&vs.root(), &tiny_config());

        let ids = Tensor::from_slice(&[1i64, 2, 3, 4, 5, 6]).view([2, 3]);
        let mask = Tensor::from_slice(&[1i64, 1, 1, 1, 1, 0]).view([2, 3]);
        let logits = model.forward(&ids, &mask, false);

        assert_eq!(logits.size(), vec![2, 3]);
    }

    #[test]
    fn padding_does_not_change_eval_logits() {
        let vs = nn::VarStore::new(Device::Cpu);
        let model = SequenceClassifier::new(&vs.root(), &tiny_config());

        let short_ids = Tensor::from_slice(&[2i64, 7, 9]).view([1, 3]);
        let short_mask = Tensor::from_slice(&[1i64, 1, 1]).view([1, 3]);
        let padded_ids = Tensor::from_slice(&[2i64, 7, 9, 0, 0]).view([1, 5]);
        let padded_mask = Tensor::from_slice(&[1i64, 1, 1, 0, 0]).view([1, 5]);

        let a = model.forward(&short_ids, &short_mask, false);
        let b = model.forward(&padded_ids, &padded_mask, false);

        let diff = (a - b).abs().max().double_value(&[]);
        assert!(diff < 1e-5, "logits moved by {diff}");
    }

    #[test]
    fn variables_follow_bert_naming() {
        let vs = nn::VarStore::new(Device::Cpu);
        let _model = SequenceClassifier::new(&vs.root(), &tiny_config());
        let names = vs.variables();

        for expected in [
            "bert.embeddings.word_embeddings.weight",
            "bert.embeddings.LayerNorm.weight",
            "bert.encoder.layer.0.attention.self.query.weight",
            "bert.encoder.layer.0.attention.output.LayerNorm.bias",
            "bert.encoder.layer.0.intermediate.dense.weight",
            "bert.encoder.layer.0.output.dense.bias",
            "bert.pooler.dense.weight",
            "classifier.weight",
        ] {
            assert!(names.contains_key(expected), "missing {expected}");
        }
    }
}
