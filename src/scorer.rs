use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::info;

use crate::config::{DetectorConfig, TrainingSet};
use crate::error::ModelError;
use crate::forest::{ForestConfig, IsolationForest};
use crate::generator::{MAX_AMOUNT, MIN_AMOUNT};
use crate::transaction::{RawTransaction, Status, HISTORY_LEN};

pub const FEATURE_COUNT: usize = 3;
/// Amounts enter the model in millions.
pub const AMOUNT_SCALE: f64 = 1_000_000.0;

const TRAFFIC_SAMPLES: usize = 400;
const CLUSTER_SAMPLES: usize = 100;
const CLUSTER_SIGMA: f64 = 0.3;
const CLUSTER_SHIFT: f64 = 2.0;
/// Share of the day inside the 00-04 window.
const EARLY_MORNING_SHARE: f64 = 5.0 / 24.0;

/// [amount in millions, early-morning indicator, history length]
pub fn extract_features(tx: &RawTransaction) -> [f64; FEATURE_COUNT] {
    [
        tx.amount as f64 / AMOUNT_SCALE,
        if tx.is_early_morning() { 1.0 } else { 0.0 },
        tx.history.len() as f64,
    ]
}

/// The fixed synthetic dataset the detector is fitted on at startup.
pub fn training_data(set: TrainingSet, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    match set {
        TrainingSet::Traffic => (0..TRAFFIC_SAMPLES)
            .map(|_| {
                let amount = rng.gen_range(MIN_AMOUNT..=MAX_AMOUNT) as f64 / AMOUNT_SCALE;
                let early = if rng.gen_bool(EARLY_MORNING_SHARE) { 1.0 } else { 0.0 };
                vec![amount, early, HISTORY_LEN as f64]
            })
            .collect(),
        TrainingSet::Clusters => {
            let base: Vec<Vec<f64>> = (0..CLUSTER_SAMPLES)
                .map(|_| {
                    (0..FEATURE_COUNT)
                        .map(|_| CLUSTER_SIGMA * rng.sample::<f64, _>(StandardNormal))
                        .collect()
                })
                .collect();
            let shifted = |delta: f64| -> Vec<Vec<f64>> {
                base.iter()
                    .map(|row| row.iter().map(|v| v + delta).collect())
                    .collect()
            };
            let mut data = shifted(CLUSTER_SHIFT);
            data.extend(shifted(-CLUSTER_SHIFT));
            data
        }
    }
}

/// Outcome of one scoring attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub status: Status,
    /// False when the sensitivity coin flip skipped the model.
    pub consulted: bool,
    pub score: Option<f64>,
}

/// Anomaly model plus a fixed decision threshold.
#[derive(Debug, Clone)]
pub struct FraudScorer {
    model: IsolationForest,
    threshold: f64,
}

impl FraudScorer {
    /// Wrap a fitted model. The model must have been fitted on
    /// `FEATURE_COUNT` features.
    pub fn new(model: IsolationForest, threshold: f64) -> Result<Self, ModelError> {
        if model.n_features() != FEATURE_COUNT {
            return Err(ModelError::FeatureMismatch {
                fitted: model.n_features(),
                found: FEATURE_COUNT,
            });
        }
        Ok(FraudScorer { model, threshold })
    }

    /// Build the training set named in `config` and fit on it.
    pub fn fit(config: &DetectorConfig) -> Result<Self, ModelError> {
        let data = training_data(config.training_set, config.training_seed);
        let forest_config = ForestConfig {
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            contamination: config.contamination,
        };
        let model = IsolationForest::fit(&data, &forest_config, config.training_seed)?;
        info!(
            training_set = config.training_set.name(),
            samples = data.len(),
            trees = model.n_estimators(),
            offset = model.offset(),
            "anomaly model fitted"
        );
        Self::new(model, config.threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model(&self) -> &IsolationForest {
        &self.model
    }

    /// Decision score, lower is more anomalous.
    pub fn score(&self, tx: &RawTransaction) -> f64 {
        self.model.decision_unchecked(&extract_features(tx))
    }

    /// Consult the model with probability `sensitivity`; otherwise the
    /// transaction is normal without scoring.
    pub fn assess<R: Rng>(&self, tx: &RawTransaction, sensitivity: f64, rng: &mut R) -> Assessment {
        if rng.gen::<f64>() >= sensitivity {
            return Assessment {
                status: Status::Normal,
                consulted: false,
                score: None,
            };
        }
        let score = self.score(tx);
        let status = if score < self.threshold {
            Status::Fraud
        } else {
            Status::Normal
        };
        Assessment {
            status,
            consulted: true,
            score: Some(score),
        }
    }
}
