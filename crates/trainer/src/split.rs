use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

use crate::error::{Result, TrainerError};

/// Row indices of each side of a train/validation split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Stratified random split: every class keeps (approximately) the same share on
/// both sides. The validation side gets `ceil(val_fraction * n)` rows.
///
/// The result depends only on `labels` (including their order) and `seed`.
pub fn stratified_split(labels: &[i64], val_fraction: f64, seed: u64) -> Result<Split> {
    let n = labels.len();
    let n_val = (val_fraction * n as f64).ceil() as usize;
    if n_val == 0 || n_val >= n {
        return Err(TrainerError::Split(format!(
            "val_split={val_fraction} leaves an empty side for {n} samples"
        )));
    }
    let n_train = n - n_val;

    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        classes.entry(label).or_default().push(i);
    }

    if let Some((label, members)) = classes.iter().find(|(_, members)| members.len() < 2) {
        return Err(TrainerError::Split(format!(
            "the least populated class ({label}) has only {} member; every class needs at least 2",
            members.len()
        )));
    }
    if n_val < classes.len() || n_train < classes.len() {
        return Err(TrainerError::Split(format!(
            "{} classes do not fit into {n_train} train / {n_val} validation samples",
            classes.len()
        )));
    }

    let counts: Vec<usize> = classes.values().map(Vec::len).collect();
    let val_counts = allocate(&counts, n_val);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut validation = Vec::with_capacity(n_val);

    for (members, take) in classes.into_values().zip(val_counts) {
        let mut members = members;
        members.shuffle(&mut rng);
        validation.extend_from_slice(&members[..take]);
        train.extend_from_slice(&members[take..]);
    }

    train.shuffle(&mut rng);
    validation.shuffle(&mut rng);

    Ok(Split { train, validation })
}

/// Distributes `draws` over classes proportionally to `counts`; leftover draws go
/// to the classes with the largest fractional share, lowest class first on ties.
fn allocate(counts: &[usize], draws: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    let mut taken: Vec<usize> = counts.iter().map(|&c| c * draws / total).collect();
    let remainders: Vec<usize> = counts.iter().map(|&c| c * draws % total).collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));

    let leftover = draws - taken.iter().sum::<usize>();
    for &class in order.iter().take(leftover) {
        taken[class] += 1;
    }
    taken
}
