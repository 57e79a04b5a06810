// ============================================================
// Layer 4 — Stratified Train/Test Splitter
// ============================================================
// Splits labelled samples into train and test sets so that
// each author keeps (roughly) its share of the corpus in both.
//
// Sizing follows the usual convention:
//   test size  = ceil(test_fraction * n)
//   train size = n - test size
//
// The test size is divided between classes by largest
// remainder, then nudged so that every class has at least one
// member on each side. Classes with fewer than 2 members make
// stratification impossible and are rejected.
//
// Shuffling uses a seeded StdRng, so the same seed always
// yields the same split.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::BTreeMap;

use crate::domain::error::SplitError;
use crate::domain::record::LabeledSample;

/// A disjoint train/test partition.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<LabeledSample>,
    pub test:  Vec<LabeledSample>,
}

/// Stratified split of `samples` by label.
pub fn stratified_split(
    samples:       Vec<LabeledSample>,
    test_fraction: f64,
    seed:          u64,
) -> Result<Split, SplitError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction.to_string()));
    }
    if samples.is_empty() {
        return Err(SplitError::Empty);
    }

    let total = samples.len();

    // BTreeMap keeps class iteration order fixed for a given seed
    let mut classes: BTreeMap<usize, Vec<LabeledSample>> = BTreeMap::new();
    for s in samples {
        classes.entry(s.label).or_default().push(s);
    }

    if let Some((&label, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
        return Err(SplitError::ClassTooSmall { label, count: members.len() });
    }

    let n_classes  = classes.len();
    // The epsilon keeps 0.2 * 150 from ceiling to 31
    let test_size  = ((test_fraction * total as f64 - 1e-9).ceil() as usize).min(total);
    let train_size = total - test_size;
    if test_size < n_classes {
        return Err(SplitError::TestSizeTooSmall { test_size, classes: n_classes });
    }
    if train_size < n_classes {
        return Err(SplitError::TrainSizeTooSmall { train_size, classes: n_classes });
    }

    let counts: Vec<usize> = classes.values().map(Vec::len).collect();
    let quotas = allocate_test_quotas(&counts, test_size);

    let mut rng   = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(train_size);
    let mut test  = Vec::with_capacity(test_size);

    for (mut members, quota) in classes.into_values().zip(quotas) {
        members.shuffle(&mut rng);
        let rest = members.split_off(quota);
        test.extend(members);
        train.extend(rest);
    }

    // Interleave classes so downstream batches are mixed
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    tracing::debug!(
        "Stratified split: {} train, {} test across {} classes",
        train.len(),
        test.len(),
        n_classes
    );

    Ok(Split { train, test })
}

/// Per-class test quotas summing to `test_size`, each in [1, count - 1].
/// Callers guarantee `counts.len() <= test_size <= total - counts.len()`
/// and every count >= 2.
fn allocate_test_quotas(counts: &[usize], test_size: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * test_size as f64 / total as f64)
        .collect();

    let mut quotas: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    // Largest remainder, ties broken by class order
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });
    let assigned: usize = quotas.iter().sum();
    for &i in order.iter().take(test_size.saturating_sub(assigned)) {
        quotas[i] += 1;
    }

    // Every class needs a member on both sides
    for (q, &c) in quotas.iter_mut().zip(counts) {
        *q = (*q).clamp(1, c - 1);
    }

    // Re-balance to the exact test size
    loop {
        let sum: usize = quotas.iter().sum();
        if sum > test_size {
            let donor = (0..counts.len())
                .filter(|&i| quotas[i] > 1)
                .max_by(|&a, &b| {
                    let da = quotas[a] as f64 - exact[a];
                    let db = quotas[b] as f64 - exact[b];
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });
            match donor {
                Some(i) => quotas[i] -= 1,
                None    => break,
            }
        } else if sum < test_size {
            let taker = (0..counts.len())
                .filter(|&i| quotas[i] < counts[i] - 1)
                .max_by(|&a, &b| {
                    let da = exact[a] - quotas[a] as f64;
                    let db = exact[b] - quotas[b] as f64;
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });
            match taker {
                Some(i) => quotas[i] += 1,
                None    => break,
            }
        } else {
            break;
        }
    }

    quotas
}
