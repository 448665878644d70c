//! Isolation forest anomaly detector.
//!
//! Points that random axis-aligned splits isolate in few steps are anomalous.
//! Scores follow the usual convention:
//! - `score_samples` = -2^(-E[h(x)] / c(psi)), in [-1, 0), lower = more abnormal
//! - `decision_function` = score_samples - offset, where offset is the
//!   `contamination` quantile of the training scores

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::ModelError;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// Subsample size per tree, capped at the training set size.
    pub max_samples: usize,
    /// Expected outlier fraction in the training set, (0, 0.5].
    pub contamination: f64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn fit(samples: &[Vec<f64>], indices: &mut [usize], max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = IsolationTree { nodes: Vec::new() };
        tree.grow(samples, indices, 0, max_depth, rng);
        tree
    }

    /// Grow the subtree over `indices`, returning its root node index.
    fn grow(
        &mut self,
        samples: &[Vec<f64>],
        indices: &mut [usize],
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            size: indices.len(),
        });

        if indices.len() <= 1 || depth >= max_depth {
            return id;
        }

        // Only features that still vary inside this node can split it.
        let dims = samples[indices[0]].len();
        let mut candidates = Vec::with_capacity(dims);
        for feature in 0..dims {
            let (lo, hi) = indices
                .iter()
                .map(|&i| samples[i][feature])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            if lo < hi {
                candidates.push((feature, lo, hi));
            }
        }
        if candidates.is_empty() {
            return id;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);

        // In-place partition: [0, split) goes left.
        let mut split = 0;
        for k in 0..indices.len() {
            if samples[indices[k]][feature] < threshold {
                indices.swap(k, split);
                split += 1;
            }
        }

        let (left_idx, right_idx) = indices.split_at_mut(split);
        let left = self.grow(samples, left_idx, depth + 1, max_depth, rng);
        let right = self.grow(samples, right_idx, depth + 1, max_depth, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, x: &[f64]) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[feature] < threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average unsuccessful-search path length in a BST of `n` points, c(n).
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    n_features: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit on `samples` (one row per point). Deterministic for a given seed.
    pub fn fit(samples: &[Vec<f64>], config: &ForestConfig, seed: u64) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if config.n_estimators == 0 {
            return Err(ModelError::NoEstimators);
        }
        if !(config.contamination > 0.0 && config.contamination <= 0.5) {
            return Err(ModelError::Contamination(config.contamination));
        }
        let n_features = samples[0].len();
        for (row, sample) in samples.iter().enumerate() {
            if sample.len() != n_features {
                return Err(ModelError::RaggedRow {
                    row,
                    expected: n_features,
                    found: sample.len(),
                });
            }
        }

        let n = samples.len();
        let sample_size = config.max_samples.clamp(1, n);
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let trees: Vec<IsolationTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|t| {
                let tree_seed = seed.wrapping_add((t as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let mut indices = index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::fit(samples, &mut indices, max_depth, &mut rng)
            })
            .collect();

        let mut forest = IsolationForest {
            trees,
            sample_size,
            n_features,
            offset: 0.0,
        };

        let mut train_scores: Vec<f64> = samples.par_iter().map(|x| forest.raw_score(x)).collect();
        train_scores.sort_by(|a, b| a.total_cmp(b));
        forest.offset = quantile(&train_scores, config.contamination);

        Ok(forest)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// -2^(-E[h(x)] / c(psi)). Lower is more anomalous.
    pub fn score_samples(&self, x: &[f64]) -> Result<f64, ModelError> {
        self.check_dims(x)?;
        Ok(self.raw_score(x))
    }

    /// score_samples shifted so that the contamination quantile sits at 0.
    pub fn decision_function(&self, x: &[f64]) -> Result<f64, ModelError> {
        Ok(self.score_samples(x)? - self.offset)
    }

    /// Decision value for a row already known to have `n_features` entries.
    pub(crate) fn decision_unchecked(&self, x: &[f64]) -> f64 {
        self.raw_score(x) - self.offset
    }

    fn check_dims(&self, x: &[f64]) -> Result<(), ModelError> {
        if x.len() != self.n_features {
            return Err(ModelError::FeatureMismatch {
                fitted: self.n_features,
                found: x.len(),
            });
        }
        Ok(())
    }

    fn raw_score(&self, x: &[f64]) -> f64 {
        let mean_depth =
            self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size).max(1.0);
        -(2.0_f64).powf(-mean_depth / norm)
    }
}

/// Linear-interpolated quantile of an ascending slice, `q` in [0, 1].
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
