use tch::{nn, nn::Module, Kind, Tensor};
use crate::config::EncoderConfig;

/// Bidirectional multi-head self-attention followed by the output projection,
/// residual connection and LayerNorm (post-norm, as in BERT).
pub struct SelfAttention {
    query: nn::Linear,
    key: nn::Linear,
    value: nn::Linear,
    output: nn::Linear,
    output_norm: nn::LayerNorm,
    n_head: i64,
    attn_dropout: f64,
    hidden_dropout: f64,
}

impl SelfAttention {
    /// `vs` is the `attention` path of one encoder layer.
    pub fn new(vs: &nn::Path, config: &EncoderConfig) -> Self {
        let hidden = config.hidden_size;
        let self_vs = vs / "self";
        let output_vs = vs / "output";

        let query = nn::linear(&self_vs / "query", hidden, hidden, Default::default());
        let key = nn::linear(&self_vs / "key", hidden, hidden, Default::default());
        let value = nn::linear(&self_vs / "value", hidden, hidden, Default::default());
        let output = nn::linear(&output_vs / "dense", hidden, hidden, Default::default());
        let output_norm = nn::layer_norm(
            &output_vs / "LayerNorm",
            vec![hidden],
            nn::LayerNormConfig {
                eps: config.layer_norm_eps,
                ..Default::default()
            },
        );

        Self {
            query,
            key,
            value,
            output,
            output_norm,
            n_head: config.num_attention_heads,
            attn_dropout: config.attention_probs_dropout_prob,
            hidden_dropout: config.hidden_dropout_prob,
        }
    }

    /// x: [batch, seq_len, hidden]
    /// mask_bias: [batch, 1, 1, seq_len], 0 for real tokens and a large negative value for padding.
    pub fn forward(&self, x: &Tensor, mask_bias: &Tensor, train: bool) -> Tensor {
        let size = x.size();
        let (b, t, c) = (size[0], size[1], size[2]);
        let head_size = c / self.n_head;

        let q = self.query.forward(x).view([b, t, self.n_head, head_size]).transpose(1, 2);
        let k = self.key.forward(x).view([b, t, self.n_head, head_size]).transpose(1, 2);
        let v = self.value.forward(x).view([b, t, self.n_head, head_size]).transpose(1, 2);

        let att = q.matmul(&k.transpose(-2, -1)) * (1.0 / (head_size as f64).sqrt());
        let att = (att + mask_bias)
            .softmax(-1, Kind::Float)
            .dropout(self.attn_dropout, train);

        let y = att.matmul(&v).transpose(1, 2).contiguous().view([b, t, c]);
        let y = y.apply(&self.output).dropout(self.hidden_dropout, train);

        (y + x).apply(&self.output_norm)
    }
}
