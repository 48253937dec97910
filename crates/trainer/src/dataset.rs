use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;
use tch::{Device, Kind, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::error::{Result, TrainerError};

fn tokenizer_error(e: impl std::fmt::Display) -> TrainerError {
    TrainerError::Tokenizer(e.to_string())
}

/// Pretrained tokenizer configured to truncate to `max_length` and pad each
/// encoded collection to its longest member.
pub struct TextTokenizer {
    inner: Tokenizer,
    max_length: usize,
}

impl TextTokenizer {
    pub fn from_file<P: AsRef<Path>>(path: P, max_length: usize) -> Result<Self> {
        let path = path.as_ref();
        let mut inner = Tokenizer::from_file(path)
            .map_err(|e| TrainerError::Tokenizer(format!("failed to load {}: {}", path.display(), e)))?;

        inner
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(tokenizer_error)?;

        let padding = match inner.get_padding() {
            Some(existing) => existing.clone(),
            None => {
                let (pad_id, pad_token) = ["[PAD]", "<pad>"]
                    .iter()
                    .find_map(|token| inner.token_to_id(token).map(|id| (id, token.to_string())))
                    .unwrap_or((0, "[PAD]".to_string()));
                PaddingParams {
                    pad_id,
                    pad_token,
                    ..Default::default()
                }
            }
        };
        inner.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..padding
        }));

        Ok(Self { inner, max_length })
    }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Encodes all `texts` at once; every row shares the same padded length.
    pub fn encode_all(&self, texts: &[String]) -> Result<Encoded> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self.inner.encode_batch(inputs, true).map_err(tokenizer_error)?;

        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
        let mut input_ids = Vec::with_capacity(texts.len() * seq_len);
        let mut attention_mask = Vec::with_capacity(texts.len() * seq_len);

        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        Ok(Encoded {
            input_ids,
            attention_mask,
            rows: encodings.len(),
            seq_len,
        })
    }
}

/// Row-major token ids and attention mask, `rows x seq_len`.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub rows: usize,
    pub seq_len: usize,
}

/// One mini-batch, already on the training device.
pub struct Batch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub labels: Tensor,
}

/// Tokenized examples kept as dense tensors; batches are gathered by index.
pub struct ClassificationDataset {
    input_ids: Tensor,
    attention_mask: Tensor,
    labels: Tensor,
    len: usize,
    seq_len: usize,
    device: Device,
}

impl ClassificationDataset {
    pub fn new(texts: &[String], labels: &[i64], tokenizer: &TextTokenizer, device: Device) -> Result<Self> {
        let encoded = tokenizer.encode_all(texts)?;
        Self::from_encoded(encoded, labels, device)
    }

    pub fn from_encoded(encoded: Encoded, labels: &[i64], device: Device) -> Result<Self> {
        if encoded.rows != labels.len() {
            return Err(TrainerError::Tokenizer(format!(
                "{} encodings for {} labels",
                encoded.rows,
                labels.len()
            )));
        }
        let shape = [encoded.rows as i64, encoded.seq_len as i64];

        Ok(Self {
            input_ids: Tensor::from_slice(&encoded.input_ids).view(shape).to(device),
            attention_mask: Tensor::from_slice(&encoded.attention_mask).view(shape).to(device),
            labels: Tensor::from_slice(labels).to_kind(Kind::Int64).to(device),
            len: encoded.rows,
            seq_len: encoded.seq_len,
            device,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn num_batches(&self, batch_size: usize) -> usize {
        self.len.div_ceil(batch_size)
    }

    /// Batches in storage order, or in a fresh random order when `rng` is given.
    /// The last batch may be smaller than `batch_size`.
    pub fn batches(&self, batch_size: usize, rng: Option<&mut StdRng>) -> BatchIter<'_> {
        let mut order: Vec<i64> = (0..self.len as i64).collect();
        if let Some(rng) = rng {
            order.shuffle(rng);
        }
        BatchIter {
            dataset: self,
            order,
            batch_size: batch_size.max(1),
            position: 0,
        }
    }
}

pub struct BatchIter<'a> {
    dataset: &'a ClassificationDataset,
    order: Vec<i64>,
    batch_size: usize,
    position: usize,
}

impl Iterator for BatchIter<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.position >= self.order.len() {
            return None;
        }
        let end = (self.position + self.batch_size).min(self.order.len());
        let index = Tensor::from_slice(&self.order[self.position..end]).to(self.dataset.device);
        self.position = end;

        Some(Batch {
            input_ids: self.dataset.input_ids.index_select(0, &index),
            attention_mask: self.dataset.attention_mask.index_select(0, &index),
            labels: self.dataset.labels.index_select(0, &index),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;

    /// Whitespace WordLevel tokenizer covering the mock-dataset vocabulary.
    pub(crate) fn write_test_tokenizer(dir: &Path) -> std::path::PathBuf {
        let words = [
            "[PAD]", "[UNK]", "This", "is", "a", "positive", "negative", "example", "Another", "case",
        ];
        let vocab: serde_json::Map<String, serde_json::Value> = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.to_string(), serde_json::Value::from(i)))
            .collect();
        let tokenizer = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
        });
        let path = dir.join("tokenizer.json");
        std::fs::write(&path, tokenizer.to_string()).unwrap();
        path
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pads_to_longest_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer = TextTokenizer::from_file(write_test_tokenizer(dir.path()), 4).unwrap();

        let encoded = tokenizer
            .encode_all(&texts(&["This is a positive example", "Another case"]))
            .unwrap();

        assert_eq!(encoded.rows, 2);
        assert_eq!(encoded.seq_len, 4);
        assert_eq!(&encoded.input_ids[..4], &[2, 3, 4, 5]);
        assert_eq!(&encoded.input_ids[4..], &[8, 9, 0, 0]);
        assert_eq!(&encoded.attention_mask[4..], &[1, 1, 0, 0]);
    }

    #[test]
    fn unknown_words_map_to_unk() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer = TextTokenizer::from_file(write_test_tokenizer(dir.path()), 8).unwrap();
        let encoded = tokenizer.encode_all(&texts(&["zebra example"])).unwrap();
        assert_eq!(encoded.input_ids, vec![1, 7]);
    }

    fn toy_dataset(rows: usize) -> ClassificationDataset {
        let encoded = Encoded {
            input_ids: (0..rows as i64).flat_map(|i| [i, i]).collect(),
            attention_mask: vec![1; rows * 2],
            rows,
            seq_len: 2,
        };
        let labels: Vec<i64> = (0..rows as i64).collect();
        ClassificationDataset::from_encoded(encoded, &labels, Device::Cpu).unwrap()
    }

    fn labels_of(batches: BatchIter<'_>) -> Vec<Vec<i64>> {
        batches
            .map(|b| Vec::<i64>::try_from(&b.labels).unwrap())
            .collect()
    }

    #[test]
    fn ordered_batches_cover_everything_once() {
        let dataset = toy_dataset(7);
        assert_eq!(dataset.num_batches(3), 3);

        let batches = labels_of(dataset.batches(3, None));
        assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
    }

    #[test]
    fn shuffled_batches_are_a_permutation() {
        let dataset = toy_dataset(20);
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen: Vec<i64> = labels_of(dataset.batches(6, Some(&mut rng)))
            .into_iter()
            .flatten()
            .collect();
        assert_ne!(seen, (0..20).collect::<Vec<i64>>());
        seen.sort();
        assert_eq!(seen, (0..20).collect::<Vec<i64>>());
    }

    #[test]
    fn batch_rows_stay_aligned_with_labels() {
        let dataset = toy_dataset(5);
        let mut rng = StdRng::seed_from_u64(1);

        for batch in dataset.batches(2, Some(&mut rng)) {
            let ids = Vec::<i64>::try_from(&batch.input_ids.select(1, 0)).unwrap();
            let labels = Vec::<i64>::try_from(&batch.labels).unwrap();
            assert_eq!(ids, labels);
        }
    }
}
