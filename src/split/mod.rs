//! Data splitters: partition parsed image ids into ordered groups.
//!
//! The parser trusts whatever a splitter returns; it does not check that
//! groups are disjoint or exhaustive.

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::HashSet;
use std::hash::Hash;

use log::warn;

use crate::error::RecordError;
use crate::record::{IdMap, ImageId};

/// Tolerance on the sum of [`RandomSplitter`] probabilities.
const PROBS_EPSILON: f64 = 1e-6;

/// Strategy mapping image ids to ordered groups (train, valid, ...).
pub trait DataSplitter {
    fn split(&self, ids: &[ImageId]) -> Vec<Vec<ImageId>>;
}

impl<T: DataSplitter + ?Sized> DataSplitter for &T {
    fn split(&self, ids: &[ImageId]) -> Vec<Vec<ImageId>> {
        (**self).split(ids)
    }
}

/// Puts every id in one group, in input order.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleSplitSplitter;

impl DataSplitter for SingleSplitSplitter {
    fn split(&self, ids: &[ImageId]) -> Vec<Vec<ImageId>> {
        vec![ids.to_vec()]
    }
}

/// Shuffles ids and cuts them into groups by probability.
///
/// Every id lands in exactly one group. Ids inside a group are sorted so the
/// output only depends on the seed and the id set.
#[derive(Clone, Debug)]
pub struct RandomSplitter {
    probs: Vec<f64>,
    seed: Option<u64>,
}

impl RandomSplitter {
    /// `probs` must be non-negative and sum to 1.
    pub fn new(probs: Vec<f64>, seed: Option<u64>) -> Result<Self, RecordError> {
        validate_probs(&probs)?;
        Ok(Self { probs, seed })
    }

    pub fn probs(&self) -> &[f64] {
        &self.probs
    }
}

impl DataSplitter for RandomSplitter {
    fn split(&self, ids: &[ImageId]) -> Vec<Vec<ImageId>> {
        let mut shuffled = ids.to_vec();
        if let Some(seed) = self.seed {
            let mut rng = StdRng::seed_from_u64(seed);
            shuffled.shuffle(&mut rng);
        } else {
            let mut rng = rand::rng();
            shuffled.shuffle(&mut rng);
        }

        let mut groups = Vec::with_capacity(self.probs.len());
        let mut rest = shuffled.as_slice();
        for size in split_sizes(ids.len(), &self.probs) {
            let (group, tail) = rest.split_at(size);
            let mut group = group.to_vec();
            group.sort();
            groups.push(group);
            rest = tail;
        }
        groups
    }
}

/// Group sizes for `total` ids under `probs`.
///
/// Boundaries are the rounded cumulative probabilities; the last group
/// absorbs rounding so sizes always sum to `total`.
pub fn split_sizes(total: usize, probs: &[f64]) -> Vec<usize> {
    let mut sizes = Vec::with_capacity(probs.len());
    let mut cumulative = 0.0;
    let mut start = 0usize;

    for (i, p) in probs.iter().enumerate() {
        let end = if i + 1 == probs.len() {
            total
        } else {
            cumulative += p;
            ((cumulative * total as f64).round() as usize).clamp(start, total)
        };
        sizes.push(end - start);
        start = end;
    }

    sizes
}

fn validate_probs(probs: &[f64]) -> Result<(), RecordError> {
    if probs.is_empty() {
        return Err(RecordError::InvalidSplit {
            message: "at least one split probability is required".to_string(),
        });
    }

    if let Some(bad) = probs.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(RecordError::InvalidSplit {
            message: format!("split probabilities must be non-negative, got {}", bad),
        });
    }

    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > PROBS_EPSILON {
        return Err(RecordError::InvalidSplit {
            message: format!("split probabilities must sum to 1, got {}", sum),
        });
    }

    Ok(())
}

/// Uses predefined groups of ids.
///
/// Ids that were never parsed are dropped from the output.
#[derive(Clone, Debug, Default)]
pub struct FixedSplitter {
    splits: Vec<Vec<ImageId>>,
}

impl FixedSplitter {
    pub fn new(splits: Vec<Vec<ImageId>>) -> Self {
        Self { splits }
    }

    /// Builds groups from external image keys, assigning ids through `idmap`.
    ///
    /// Pass the same `idmap` to the parser afterwards so the ids line up.
    pub fn from_external<K>(splits: Vec<Vec<K>>, idmap: &mut IdMap<K>) -> Self
    where
        K: Hash + Eq + Clone,
    {
        let splits = splits
            .into_iter()
            .map(|group| group.into_iter().map(|key| idmap.lookup(key)).collect())
            .collect();
        Self { splits }
    }
}

impl DataSplitter for FixedSplitter {
    fn split(&self, ids: &[ImageId]) -> Vec<Vec<ImageId>> {
        let present: HashSet<ImageId> = ids.iter().copied().collect();
        let mut dropped = 0usize;

        let groups = self
            .splits
            .iter()
            .map(|group| {
                group
                    .iter()
                    .copied()
                    .filter(|id| {
                        let keep = present.contains(id);
                        if !keep {
                            dropped += 1;
                        }
                        keep
                    })
                    .collect()
            })
            .collect();

        if dropped > 0 {
            warn!("fixed split dropped {} id(s) that were never parsed", dropped);
        }
        groups
    }
}
