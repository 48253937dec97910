use std::collections::BTreeSet;

/// Validation results for one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    pub loss: f64,
    pub accuracy: f64,
    pub f1: f64,
}

pub fn accuracy(targets: &[i64], predictions: &[i64]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    let correct = targets
        .iter()
        .zip(predictions)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / targets.len() as f64
}

/// Support-weighted mean of per-class F1 scores.
///
/// Classes are the union of targets and predictions; a class with zero precision
/// and recall scores 0, and classes that never occur in `targets` carry no weight.
pub fn weighted_f1(targets: &[i64], predictions: &[i64]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }

    let classes: BTreeSet<i64> = targets.iter().chain(predictions).copied().collect();
    let mut weighted_sum = 0.0;

    for class in classes {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&t, &p) in targets.iter().zip(predictions) {
            match (t == class, p == class) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let support = tp + fn_;
        if support == 0 {
            continue;
        }
        let precision = if tp + fp == 0 { 0.0 } else { tp as f64 / (tp + fp) as f64 };
        let recall = tp as f64 / support as f64;
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        weighted_sum += f1 * support as f64;
    }

    weighted_sum / targets.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn perfect_predictions() {
        let y = [0, 1, 2, 1];
        assert!(close(accuracy(&y, &y), 1.0));
        assert!(close(weighted_f1(&y, &y), 1.0));
    }

    #[test]
    fn constant_prediction_on_balanced_data() {
        let targets = [0, 1, 0, 1];
        let predictions = [1, 1, 1, 1];

        assert!(close(accuracy(&targets, &predictions), 0.5));
        // class 1: p=0.5 r=1 f1=2/3, class 0: f1=0; weights 2 and 2
        assert!(close(weighted_f1(&targets, &predictions), 1.0 / 3.0));
    }

    #[test]
    fn matches_hand_computed_weighted_f1() {
        let targets = [0, 0, 0, 1, 1, 2];
        let predictions = [0, 0, 1, 1, 2, 2];
        // class 0: p=1 r=2/3 f1=0.8 (w3); class 1: p=0.5 r=0.5 f1=0.5 (w2);
        // class 2: p=0.5 r=1 f1=2/3 (w1)
        let expected = (0.8 * 3.0 + 0.5 * 2.0 + 2.0 / 3.0) / 6.0;
        assert!(close(weighted_f1(&targets, &predictions), expected));
    }

    #[test]
    fn all_wrong_scores_zero() {
        assert!(close(weighted_f1(&[0, 0], &[1, 1]), 0.0));
        assert!(close(accuracy(&[0, 0], &[1, 1]), 0.0));
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(weighted_f1(&[], &[]), 0.0);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }
}
