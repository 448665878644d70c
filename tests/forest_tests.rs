use approx::assert_relative_eq;
use fraudguard::config::{DetectorConfig, TrainingSet};
use fraudguard::error::ModelError;
use fraudguard::forest::*;
use fraudguard::scorer::{training_data, FraudScorer, FEATURE_COUNT};

const TEST_SEED: u64 = 42;

// ═══════════════════════════════════════════════════════════════════════
// Path length normaliser
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_average_path_length_values() {
    assert_relative_eq!(average_path_length(3), 1.207_392_357_589_623, epsilon = 1e-12);
    assert_relative_eq!(average_path_length(256), 10.244_770_920_119_917, epsilon = 1e-12);
    assert_relative_eq!(average_path_length(400), 11.137_354_163_582_792, epsilon = 1e-12);
}

#[test]
fn test_average_path_length_monotone() {
    let mut prev = average_path_length(2);
    for n in 3..1000 {
        let c = average_path_length(n);
        assert!(c > prev);
        prev = c;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Fitted behaviour
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_contamination_share_of_training_is_negative() {
    let data = training_data(TrainingSet::Traffic, TEST_SEED);
    let forest = IsolationForest::fit(&data, &ForestConfig::default(), TEST_SEED).unwrap();
    let negative = data
        .iter()
        .filter(|x| forest.decision_function(x).unwrap() < 0.0)
        .count();
    let share = negative as f64 / data.len() as f64;
    assert_relative_eq!(share, 0.2, epsilon = 0.03);
}

#[test]
fn test_decision_is_score_minus_offset() {
    let data = training_data(TrainingSet::Clusters, TEST_SEED);
    let forest = IsolationForest::fit(&data, &ForestConfig::default(), TEST_SEED).unwrap();
    let x = [2.0, 2.0, 2.0];
    assert_relative_eq!(
        forest.decision_function(&x).unwrap(),
        forest.score_samples(&x).unwrap() - forest.offset(),
        epsilon = 1e-12
    );
}

#[test]
fn test_gap_between_clusters_is_anomalous() {
    let data = training_data(TrainingSet::Clusters, TEST_SEED);
    let forest = IsolationForest::fit(&data, &ForestConfig::default(), TEST_SEED).unwrap();
    let centre = forest.decision_function(&[2.0, 2.0, 2.0]).unwrap();
    let far = forest.decision_function(&[8.0, -8.0, 8.0]).unwrap();
    assert!(far < centre, "far={} centre={}", far, centre);
    assert!(centre > 0.0, "cluster centre should be an inlier: {}", centre);
    assert!(far < 0.0, "far point should be an outlier: {}", far);
}

#[test]
fn test_subsample_capped_at_training_size() {
    let data: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i * 7 % 11) as f64]).collect();
    let config = ForestConfig {
        n_estimators: 10,
        max_samples: 256,
        contamination: 0.1,
    };
    let forest = IsolationForest::fit(&data, &config, TEST_SEED).unwrap();
    assert_eq!(forest.n_estimators(), 10);
    assert_eq!(forest.n_features(), 2);
    for x in &data {
        let s = forest.score_samples(x).unwrap();
        assert!((-1.0..0.0).contains(&s));
    }
}

#[test]
fn test_different_seeds_differ() {
    let data = training_data(TrainingSet::Traffic, TEST_SEED);
    let a = IsolationForest::fit(&data, &ForestConfig::default(), 1).unwrap();
    let b = IsolationForest::fit(&data, &ForestConfig::default(), 2).unwrap();
    assert_ne!(a.offset(), b.offset());
}

// ═══════════════════════════════════════════════════════════════════════
// Dimension checks
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_dimension_mismatch_is_error() {
    let data = training_data(TrainingSet::Traffic, TEST_SEED);
    let forest = IsolationForest::fit(&data, &ForestConfig::default(), TEST_SEED).unwrap();
    assert_eq!(forest.n_features(), FEATURE_COUNT);
    assert_eq!(
        forest.score_samples(&[1.0, 0.0]).unwrap_err(),
        ModelError::FeatureMismatch {
            fitted: 3,
            found: 2
        }
    );
    assert!(forest.decision_function(&[1.0, 0.0, 3.0, 4.0]).is_err());
}

#[test]
fn test_zero_estimators_rejected() {
    let data = training_data(TrainingSet::Traffic, TEST_SEED);
    let config = ForestConfig {
        n_estimators: 0,
        ..ForestConfig::default()
    };
    assert_eq!(
        IsolationForest::fit(&data, &config, TEST_SEED).unwrap_err(),
        ModelError::NoEstimators
    );
}

#[test]
fn test_scorer_fits_both_training_sets() {
    for set in [TrainingSet::Traffic, TrainingSet::Clusters] {
        let config = DetectorConfig {
            training_set: set,
            ..DetectorConfig::default()
        };
        let scorer = FraudScorer::fit(&config).unwrap();
        assert_eq!(scorer.model().n_features(), FEATURE_COUNT);
        assert_relative_eq!(scorer.threshold(), -0.1);
    }
}
