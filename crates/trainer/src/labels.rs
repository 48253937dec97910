use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::data::{RawLabel, RawRecord};
use crate::error::{Result, TrainerError};

/// How raw labels map to class ids for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LabelVocabulary {
    /// String labels; ids assigned in sorted order of the distinct values.
    Named { label_to_id: BTreeMap<String, i64> },
    /// Numeric labels used as class ids directly.
    Numeric { labels: BTreeSet<i64> },
}

impl LabelVocabulary {
    pub fn num_classes(&self) -> usize {
        match self {
            LabelVocabulary::Named { label_to_id } => label_to_id.len(),
            LabelVocabulary::Numeric { labels } => labels.len(),
        }
    }

    /// Numeric labels must already be valid class indices.
    pub fn check_class_range(&self) -> Result<()> {
        if let LabelVocabulary::Numeric { labels } = self {
            let num_labels = labels.len();
            if let Some(&label) = labels.iter().find(|&&l| l < 0 || l as usize >= num_labels) {
                return Err(TrainerError::LabelOutOfRange { label, num_labels });
            }
        }
        Ok(())
    }
}

/// Texts with integer class ids, plus the vocabulary that produced them.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub texts: Vec<String>,
    pub labels: Vec<i64>,
    pub vocabulary: LabelVocabulary,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn select(&self, indices: &[usize]) -> (Vec<String>, Vec<i64>) {
        indices
            .iter()
            .map(|&i| (self.texts[i].clone(), self.labels[i]))
            .unzip()
    }
}

/// Resolves raw labels into class ids. Callers must pass at least one record.
pub fn normalize(records: Vec<RawRecord>) -> Result<LabeledDataset> {
    let any_text = records.iter().any(|r| r.label.is_text());
    let all_text = records.iter().all(|r| r.label.is_text());
    if any_text && !all_text {
        return Err(TrainerError::MixedLabels);
    }

    let (texts, raw): (Vec<String>, Vec<RawLabel>) =
        records.into_iter().map(|r| (r.text, r.label)).unzip();

    if all_text {
        let distinct: BTreeSet<&str> = raw
            .iter()
            .filter_map(|l| match l {
                RawLabel::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        let label_to_id: BTreeMap<String, i64> = distinct
            .into_iter()
            .enumerate()
            .map(|(id, label)| (label.to_string(), id as i64))
            .collect();

        let labels = raw
            .iter()
            .filter_map(|l| match l {
                RawLabel::Text(s) => label_to_id.get(s).copied(),
                _ => None,
            })
            .collect();

        info!("Label mapping: {:?}", label_to_id);
        return Ok(LabeledDataset {
            texts,
            labels,
            vocabulary: LabelVocabulary::Named { label_to_id },
        });
    }

    let labels = raw
        .iter()
        .map(|l| match l {
            RawLabel::Integer(n) => Ok(*n),
            RawLabel::Float(f) => Ok(f.trunc() as i64),
            RawLabel::Text(_) => Err(TrainerError::MixedLabels),
        })
        .collect::<Result<Vec<i64>>>()?;
    let distinct: BTreeSet<i64> = labels.iter().copied().collect();

    info!("Labels: {:?}", distinct);
    Ok(LabeledDataset {
        texts,
        labels,
        vocabulary: LabelVocabulary::Numeric { labels: distinct },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(label: &str) -> RawRecord {
        RawRecord {
            text: format!("about {label}"),
            label: RawLabel::Text(label.to_string()),
        }
    }

    fn number(label: i64) -> RawRecord {
        RawRecord {
            text: format!("about {label}"),
            label: RawLabel::Integer(label),
        }
    }

    #[test]
    fn string_labels_get_sorted_ids() {
        let dataset = normalize(vec![text("neg"), text("pos"), text("neg")]).unwrap();

        let expected: BTreeMap<String, i64> =
            [("neg".to_string(), 0), ("pos".to_string(), 1)].into_iter().collect();
        assert_eq!(dataset.vocabulary, LabelVocabulary::Named { label_to_id: expected });
        assert_eq!(dataset.labels, vec![0, 1, 0]);
    }

    #[test]
    fn mapping_ignores_first_appearance_order() {
        let a = normalize(vec![text("pos"), text("neg"), text("neutral")]).unwrap();
        let b = normalize(vec![text("neutral"), text("neg"), text("pos")]).unwrap();

        assert_eq!(a.vocabulary, b.vocabulary);
        assert_eq!(a.labels, vec![2, 0, 1]);
    }

    #[test]
    fn numeric_labels_pass_through() {
        let mut records = vec![number(1), number(0), number(2)];
        records.push(RawRecord {
            text: "float".to_string(),
            label: RawLabel::Float(1.0),
        });
        let dataset = normalize(records).unwrap();

        assert_eq!(dataset.labels, vec![1, 0, 2, 1]);
        assert_eq!(dataset.vocabulary.num_classes(), 3);
        assert!(dataset.vocabulary.check_class_range().is_ok());
    }

    #[test]
    fn sparse_numeric_labels_are_out_of_range() {
        let dataset = normalize(vec![number(1), number(5)]).unwrap();
        assert!(matches!(
            dataset.vocabulary.check_class_range(),
            Err(TrainerError::LabelOutOfRange { label: 5, num_labels: 2 })
        ));
    }

    #[test]
    fn mixed_labels_are_rejected() {
        assert!(matches!(
            normalize(vec![text("pos"), number(0)]),
            Err(TrainerError::MixedLabels)
        ));
    }

    #[test]
    fn select_keeps_pairs_together() {
        let dataset = normalize(vec![text("a"), text("b"), text("c")]).unwrap();
        let (texts, labels) = dataset.select(&[2, 0]);

        assert_eq!(texts, vec!["about c".to_string(), "about a".to_string()]);
        assert_eq!(labels, vec![2, 0]);
    }
}
